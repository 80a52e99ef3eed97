use crate::loader::{combine_loaders, Loader, LoaderOptions, Plan};

use Plan::{Leaf, Parallel, Sequential};

fn plain(name: &'static str) -> Loader<&'static str> {
    Loader::new(name, LoaderOptions::default())
}

fn blocking(name: &'static str) -> Loader<&'static str> {
    Loader::new(name, LoaderOptions::blocking())
}

fn sibling(name: &'static str) -> Loader<&'static str> {
    Loader::new(name, LoaderOptions::blocking_sibling())
}

#[test]
fn empty() {
    assert_eq!(combine_loaders::<&str>(vec![]), Sequential(vec![]));
}

#[test]
fn blocking_then_single_parallel_is_flat() {
    assert_eq!(
        combine_loaders(vec![vec![blocking("f1")], vec![plain("f2")]]),
        Sequential(vec![Leaf("f1"), Leaf("f2")]),
    );
}

#[test]
fn non_blocking_groups_run_in_parallel() {
    assert_eq!(
        combine_loaders(vec![vec![plain("f1")], vec![plain("f2")]]),
        Sequential(vec![Parallel(vec![Leaf("f1"), Leaf("f2")])]),
    );
}

#[test]
fn blocking_flushes_open_parallel_group() {
    assert_eq!(
        combine_loaders(vec![
            vec![plain("a")],
            vec![plain("b")],
            vec![blocking("c")],
            vec![plain("d")],
            vec![plain("e")],
        ]),
        Sequential(vec![
            Parallel(vec![Leaf("a"), Leaf("b")]),
            Leaf("c"),
            Parallel(vec![Leaf("d"), Leaf("e")]),
        ]),
    );
}

#[test]
fn consecutive_blocking_groups() {
    assert_eq!(
        combine_loaders(vec![
            vec![blocking("a")],
            vec![blocking("b")],
            vec![plain("c")],
        ]),
        Sequential(vec![Leaf("a"), Leaf("b"), Leaf("c")]),
    );
}

#[test]
fn group_is_blocking_if_any_member_is() {
    assert_eq!(
        combine_loaders(vec![
            vec![plain("a")],
            vec![plain("b"), blocking("c")],
            vec![plain("d")],
        ]),
        Sequential(vec![
            Leaf("a"),
            Parallel(vec![Leaf("b"), Leaf("c")]),
            Leaf("d"),
        ]),
    );
}

#[test]
fn siblings_without_blocking_are_parallel() {
    assert_eq!(
        combine_loaders(vec![vec![plain("a"), plain("b")], vec![plain("c")]]),
        Sequential(vec![Parallel(vec![
            Parallel(vec![Leaf("a"), Leaf("b")]),
            Leaf("c"),
        ])]),
    );
}

#[test]
fn blocking_siblings_nest_sequentially() {
    assert_eq!(
        combine_loaders(vec![vec![
            sibling("a"),
            plain("b"),
            plain("c"),
            sibling("d"),
        ]]),
        Sequential(vec![Sequential(vec![
            Leaf("a"),
            Parallel(vec![Leaf("b"), Leaf("c")]),
            Leaf("d"),
        ])]),
    );
}

#[test]
fn blocking_sibling_group_beside_blocking_group() {
    assert_eq!(
        combine_loaders(vec![
            vec![plain("root")],
            vec![sibling("a"), plain("b")],
            vec![blocking("leaf")],
        ]),
        Sequential(vec![
            Parallel(vec![
                Leaf("root"),
                Sequential(vec![Leaf("a"), Leaf("b")]),
            ]),
            Leaf("leaf"),
        ]),
    );
}

#[test]
fn every_loader_appears_once_in_order() {
    let plan = combine_loaders(vec![
        vec![plain("a"), sibling("b")],
        vec![blocking("c"), plain("d")],
        vec![plain("e")],
        vec![sibling("f"), sibling("g"), plain("h")],
    ]);
    assert_eq!(
        plan.leaves().into_iter().copied().collect::<Vec<_>>(),
        vec!["a", "b", "c", "d", "e", "f", "g", "h"],
    );
}

#[test]
fn deterministic() {
    let build = || {
        combine_loaders(vec![
            vec![plain("a"), sibling("b")],
            vec![blocking("c")],
            vec![plain("d"), plain("e")],
        ])
    };
    assert_eq!(build(), build());
}
