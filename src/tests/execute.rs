use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::json;
use tokio::time::{sleep, timeout};

use crate::{
    error::{LoadError, NavError, StructuralError},
    loader::{
        combine_loaders, execute, merge_props, BoundLoad, LoadResult, Loader, LoaderOptions, Plan,
        Props,
    },
};

type Log = Arc<Mutex<Vec<String>>>;

fn props(value: serde_json::Value) -> Props {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("not an object"),
    }
}

fn bound<F, Fut>(f: F) -> BoundLoad
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LoadResult> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// A loader that records its start and end, sleeping in between.
fn timed(log: &Log, name: &'static str, ms: u64, value: serde_json::Value) -> BoundLoad {
    let log = log.clone();
    bound(move || {
        let log = log.clone();
        let value = value.clone();
        async move {
            log.lock().push(format!("start {name}"));
            sleep(Duration::from_millis(ms)).await;
            log.lock().push(format!("end {name}"));
            Ok(Some(props(value)))
        }
    })
}

fn failing(message: &'static str) -> BoundLoad {
    bound(move || async move { Err(LoadError::new(message).into()) })
}

fn nothing() -> BoundLoad {
    bound(|| async { Ok(None) })
}

fn never_cancelled() -> bool {
    false
}

#[test]
fn merge_is_right_biased() {
    let a = props(json!({"a": 1, "b": 1}));
    let b = props(json!({"b": 2, "c": 2}));
    assert_eq!(
        merge_props(Some(a.clone()), Some(b.clone())),
        Some(props(json!({"a": 1, "b": 2, "c": 2}))),
    );
    assert_eq!(merge_props(Some(a.clone()), None), Some(a.clone()));
    assert_eq!(merge_props(None, Some(b.clone())), Some(b));
    assert_eq!(merge_props(None, None), None);
}

#[tokio::test]
async fn sequential_steps_wait_for_settlement() -> anyhow::Result<()> {
    let log = Log::default();
    let plan = Plan::Sequential(vec![
        Plan::Leaf(timed(&log, "a", 30, json!({"a": 1, "shared": "a"}))),
        Plan::Leaf(nothing()),
        Plan::Leaf(timed(&log, "b", 1, json!({"b": 2, "shared": "b"}))),
    ]);
    let result = execute(&plan, &never_cancelled).await?;
    assert_eq!(
        result,
        Some(props(json!({"a": 1, "shared": "b", "b": 2}))),
    );
    assert_eq!(*log.lock(), vec!["start a", "end a", "start b", "end b"]);
    Ok(())
}

#[tokio::test]
async fn parallel_steps_start_together() -> anyhow::Result<()> {
    let log = Log::default();
    let plan = Plan::Parallel(vec![
        Plan::Leaf(timed(&log, "slow", 40, json!({"x": "slow"}))),
        Plan::Leaf(timed(&log, "fast", 1, json!({"x": "fast", "y": 1}))),
    ]);
    let result = execute(&plan, &never_cancelled).await?;
    // merged in declaration order, not completion order
    assert_eq!(result, Some(props(json!({"x": "fast", "y": 1}))));
    assert_eq!(
        *log.lock(),
        vec!["start slow", "start fast", "end fast", "end slow"],
    );
    Ok(())
}

#[tokio::test]
async fn combined_plan_runs_blocking_first() -> anyhow::Result<()> {
    let log = Log::default();
    let plan = combine_loaders(vec![
        vec![Loader::new(
            timed(&log, "root", 20, json!({"root": true})),
            LoaderOptions::blocking(),
        )],
        vec![Loader::new(
            timed(&log, "left", 10, json!({"left": true})),
            LoaderOptions::default(),
        )],
        vec![Loader::new(
            timed(&log, "right", 1, json!({"right": true})),
            LoaderOptions::default(),
        )],
    ]);
    let result = execute(&plan, &never_cancelled).await?;
    assert_eq!(
        result,
        Some(props(json!({"root": true, "left": true, "right": true}))),
    );
    assert_eq!(
        *log.lock(),
        vec![
            "start root",
            "end root",
            "start left",
            "start right",
            "end right",
            "end left",
        ],
    );
    Ok(())
}

#[tokio::test]
async fn cancellation_stops_sequence_with_partial_result() -> anyhow::Result<()> {
    let log = Log::default();
    let cancelled = Arc::new(AtomicBool::new(false));
    let cancel_after: BoundLoad = {
        let cancelled = cancelled.clone();
        bound(move || {
            let cancelled = cancelled.clone();
            async move {
                cancelled.store(true, Ordering::SeqCst);
                Ok(Some(props(json!({"discarded": true}))))
            }
        })
    };
    let plan = Plan::Sequential(vec![
        Plan::Leaf(timed(&log, "first", 1, json!({"first": 1}))),
        Plan::Leaf(cancel_after),
        Plan::Leaf(timed(&log, "never", 1, json!({"never": 1}))),
    ]);
    let is_cancelled = {
        let cancelled = cancelled.clone();
        move || cancelled.load(Ordering::SeqCst)
    };
    let result = execute(&plan, &is_cancelled).await?;
    assert_eq!(result, Some(props(json!({"first": 1}))));
    assert_eq!(*log.lock(), vec!["start first", "end first"]);
    Ok(())
}

#[tokio::test]
async fn cancelled_parallel_group_discards_results() -> anyhow::Result<()> {
    let log = Log::default();
    let cancelled = Arc::new(AtomicBool::new(false));
    let plan = Plan::Parallel(vec![
        Plan::Leaf(timed(&log, "a", 20, json!({"a": 1}))),
        Plan::Leaf(timed(&log, "b", 20, json!({"b": 1}))),
    ]);
    let is_cancelled = {
        let cancelled = cancelled.clone();
        move || cancelled.load(Ordering::SeqCst)
    };
    let (result, _) = tokio::join!(execute(&plan, &is_cancelled), async {
        sleep(Duration::from_millis(5)).await;
        cancelled.store(true, Ordering::SeqCst);
    });
    assert_eq!(result?, None);
    // already started work still runs to completion
    assert_eq!(log.lock().len(), 4);
    Ok(())
}

#[tokio::test]
async fn failure_skips_remaining_steps() {
    let log = Log::default();
    let plan = Plan::Sequential(vec![
        Plan::Parallel(vec![
            Plan::Leaf(timed(&log, "sibling", 10, json!({"sibling": 1}))),
            Plan::Leaf(failing("boom")),
        ]),
        Plan::Leaf(timed(&log, "after", 1, json!({"after": 1}))),
    ]);
    let result = execute(&plan, &never_cancelled).await;
    assert_eq!(result, Err(NavError::Load(LoadError::new("boom"))));
    assert_eq!(*log.lock(), vec!["start sibling"]);
}

#[tokio::test]
async fn failure_does_not_wait_for_slow_sibling() -> anyhow::Result<()> {
    let log = Log::default();
    let plan = Plan::Parallel(vec![
        Plan::Leaf(timed(&log, "hung", 10_000, json!({"hung": 1}))),
        Plan::Leaf(bound(|| async { Err(NavError::redirect("/login")) })),
    ]);
    let result = timeout(Duration::from_millis(500), execute(&plan, &never_cancelled)).await?;
    assert_eq!(result, Err(NavError::redirect("/login")));
    assert_eq!(*log.lock(), vec!["start hung"]);
    Ok(())
}

#[tokio::test]
async fn empty_parallel_is_structural() {
    let plan = Plan::Sequential(vec![Plan::Parallel(vec![])]);
    assert_eq!(
        execute(&plan, &never_cancelled).await,
        Err(NavError::Structural(StructuralError::EmptyParallel)),
    );
}

#[test]
fn empty_plan_resolves_to_nothing() {
    let plan = Plan::Sequential(vec![]);
    assert_eq!(
        tokio_test::block_on(execute(&plan, &never_cancelled)),
        Ok(None),
    );
}
