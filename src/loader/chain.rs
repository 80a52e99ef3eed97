use super::Loader;

/// An execution plan for a navigation's loaders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Plan<T> {
    /// Steps run strictly in order, each starting after the previous one
    /// settled.
    Sequential(Vec<Plan<T>>),
    /// Steps started together; the group settles when all members did.
    Parallel(Vec<Plan<T>>),
    Leaf(T),
}

impl<T> Plan<T> {
    /// The leaves in execution-declaration order.
    pub fn leaves(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            Self::Leaf(load) => out.push(load),
            Self::Sequential(steps) | Self::Parallel(steps) => {
                steps.iter().for_each(|step| step.collect_leaves(out))
            }
        }
    }
}

/// Accumulates finished sequential steps and the currently open parallel
/// group.
struct Fold<T> {
    chain: Vec<Plan<T>>,
    parallel: Vec<Plan<T>>,
}

impl<T> Fold<T> {
    fn new() -> Self {
        Self {
            chain: Vec::new(),
            parallel: Vec::new(),
        }
    }

    fn flush(&mut self) {
        match self.parallel.len() {
            0 => (),
            1 => self.chain.extend(self.parallel.drain(..)),
            _ => self
                .chain
                .push(Plan::Parallel(std::mem::take(&mut self.parallel))),
        }
    }

    fn push(&mut self, unit: Plan<T>, blocking: bool) {
        if blocking {
            self.flush();
            self.chain.push(unit);
        } else {
            self.parallel.push(unit);
        }
    }

    fn finish(mut self) -> Vec<Plan<T>> {
        self.flush();
        self.chain
    }
}

/// The execution unit of a single component's loaders.
///
/// Loaders marked `blocking_sibling` are sequential steps relative to
/// their siblings, others run in parallel, with the same flush rule as
/// across components.  A unit holding a single step is that step.
fn component_unit<T>(loaders: Vec<Loader<T>>) -> Plan<T> {
    let mut fold = Fold::new();
    for loader in loaders {
        let blocking = loader.options.blocking_sibling;
        fold.push(Plan::Leaf(loader.load), blocking);
    }
    let mut steps = fold.finish();
    if steps.len() == 1 {
        steps.remove(0)
    } else {
        Plan::Sequential(steps)
    }
}

/// Fold the loaders of a matched route chain, outer to inner, into an
/// execution plan.
///
/// Component groups without a `blocking` loader accumulate into an open
/// parallel group; a group with one first flushes that parallel group (as
/// a bare step if it holds a single unit) and then becomes a sequential
/// step of its own.  The result is always a [`Plan::Sequential`] root.
pub fn combine_loaders<T>(groups: Vec<Vec<Loader<T>>>) -> Plan<T> {
    let mut fold = Fold::new();
    for group in groups {
        if group.is_empty() {
            continue;
        }
        let blocking = group.iter().any(|loader| loader.options.blocking);
        fold.push(component_unit(group), blocking);
    }
    Plan::Sequential(fold.finish())
}
