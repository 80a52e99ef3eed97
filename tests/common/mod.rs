#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use futures::{future::BoxFuture, FutureExt};
use leptos_ssr_nav::{
    loader::{load_fn, LoadFn, Props},
    HistoryAction, LoadError, Location, MatchedRoute, NavError, NavigationEvent, RouteMatch,
    RouteMatcher, Settings,
};
use parking_lot::Mutex;
use tokio::time::sleep;

/// A route table matching pathnames against the joined paths of each
/// registered route chain, `:name` segments capturing parameters.
#[derive(Clone, Default)]
pub struct Routes {
    table: Vec<(Vec<MatchedRoute>, Vec<usize>)>,
}

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, chain: Vec<MatchedRoute>, indices: &[usize]) -> Self {
        self.table.push((chain, indices.to_vec()));
        self
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn match_path(pattern: &str, pathname: &str) -> Option<HashMap<String, String>> {
    let pattern = segments(pattern);
    let path = segments(pathname);
    if pattern.len() != path.len() {
        return None;
    }
    let mut params = HashMap::new();
    for (expected, actual) in pattern.into_iter().zip(path) {
        match expected.strip_prefix(':') {
            Some(name) => {
                params.insert(name.to_string(), actual.to_string());
            }
            None if expected == actual => (),
            None => return None,
        }
    }
    Some(params)
}

impl RouteMatcher for Routes {
    fn match_routes<'a>(
        &'a self,
        location: &'a Location,
    ) -> BoxFuture<'a, Result<RouteMatch, NavError>> {
        async move {
            for (chain, indices) in &self.table {
                let candidate = RouteMatch {
                    routes: chain.clone(),
                    route_indices: indices.clone(),
                    ..Default::default()
                };
                if let Some(params) = match_path(&candidate.route_path(), &location.pathname) {
                    return Ok(RouteMatch {
                        params,
                        ..candidate
                    });
                }
            }
            Err(LoadError::not_found(format!("no route for `{}`", location.pathname)).into())
        }
        .boxed()
    }
}

pub fn props(value: serde_json::Value) -> Props {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("props must be an object"),
    }
}

pub fn returning(value: serde_json::Value) -> LoadFn {
    load_fn(move |_| {
        let value = value.clone();
        async move { Ok(Some(props(value))) }
    })
}

/// A loader counting its calls.
pub fn counted(calls: &Arc<AtomicUsize>, value: serde_json::Value) -> LoadFn {
    let calls = calls.clone();
    load_fn(move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        let value = value.clone();
        async move { Ok(Some(props(value))) }
    })
}

pub fn delayed(ms: u64, value: serde_json::Value) -> LoadFn {
    load_fn(move |_| {
        let value = value.clone();
        async move {
            sleep(Duration::from_millis(ms)).await;
            Ok(Some(props(value)))
        }
    })
}

pub fn failing(message: &'static str, status: u16) -> LoadFn {
    load_fn(move |_| async move { Err(NavError::from(LoadError::with_status(message, status))) })
}

pub fn redirecting(to: &'static str) -> LoadFn {
    load_fn(move |ctx| async move { Err(ctx.redirect(to)) })
}

pub type Events = Arc<Mutex<Vec<NavigationEvent>>>;

pub fn recorder(events: &Events) -> impl Fn(NavigationEvent) + Send + Sync + 'static {
    let events = events.clone();
    move |event| events.lock().push(event)
}

pub fn client_settings() -> Settings {
    Settings {
        ssr: false,
        ..Default::default()
    }
}

pub fn push(path: &str, key: &str, index: usize) -> Location {
    Location::from_path(path).with_key(key).with_index(index)
}

pub fn pop(path: &str, key: &str, index: usize, delta: isize) -> Location {
    push(path, key, index).with_action(HistoryAction::Pop, delta)
}
