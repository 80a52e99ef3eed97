use futures::future::{try_join_all, BoxFuture, FutureExt};

use super::{BoundLoad, LoadResult, Plan, Props};
use crate::error::{NavError, StructuralError};

/// Merge two optional results, the right side overriding the left key by
/// key.  An absent result never erases present data.
pub fn merge_props(acc: Option<Props>, next: Option<Props>) -> Option<Props> {
    match (acc, next) {
        (Some(mut acc), Some(next)) => {
            acc.extend(next);
            Some(acc)
        }
        (acc, None) => acc,
        (None, next) => next,
    }
}

/// Run an execution plan.
///
/// `is_cancelled` is polled after every leaf settles, after every
/// parallel group settles, and between sequential steps.  Once it reads
/// `true`, results settling afterwards are discarded and no further
/// sequential step is started; the data merged up to that point is
/// returned rather than an error.
///
/// A parallel group settles once all its members succeeded, or as soon as
/// any member fails or redirects; the members still running are dropped
/// at that point and their results discarded.
pub fn execute<'a>(
    plan: &'a Plan<BoundLoad>,
    is_cancelled: &'a (dyn Fn() -> bool + Send + Sync),
) -> BoxFuture<'a, LoadResult> {
    async move {
        match plan {
            Plan::Leaf(load) => {
                let result = load().await?;
                if is_cancelled() {
                    return Ok(None);
                }
                Ok(result)
            }
            Plan::Parallel(steps) => {
                if steps.is_empty() {
                    return Err(NavError::Structural(StructuralError::EmptyParallel));
                }
                let results =
                    try_join_all(steps.iter().map(|step| execute(step, is_cancelled))).await?;
                if is_cancelled() {
                    return Ok(None);
                }
                Ok(results.into_iter().fold(None, merge_props))
            }
            Plan::Sequential(steps) => {
                let mut acc = None;
                for step in steps {
                    if is_cancelled() {
                        break;
                    }
                    let result = execute(step, is_cancelled).await?;
                    acc = merge_props(acc, result);
                }
                Ok(acc)
            }
        }
    }
    .boxed()
}
