//! Per-route asynchronous data loading.
//!
//! Route components declare their loaders as a [`LoaderSpec`]; the
//! declarations of a matched route chain, outer to inner, are normalized
//! into one group of [`Loader`]s per component, filtered for the
//! environment, bound to the call-time [`LoadContext`], folded into an
//! execution [`Plan`] by [`combine_loaders`] and finally run by
//! [`execute`].

mod chain;
mod execute;

use std::{collections::HashMap, future::Future, sync::Arc};

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};

use crate::{
    cookies::CookieJar,
    error::NavError,
    location::{Location, Redirect},
    store::ContextStore,
    token::LoadingToken,
};

pub use chain::{combine_loaders, Plan};
pub use execute::{execute, merge_props};

/// The data produced by loaders, merged shallowly with right bias.
pub type Props = serde_json::Map<String, serde_json::Value>;

/// The result of a single loader: `Ok(None)` contributes nothing.
pub type LoadResult = Result<Option<Props>, NavError>;

/// A loader function as declared by a route component.
pub type LoadFn = Arc<dyn Fn(LoadContext) -> BoxFuture<'static, LoadResult> + Send + Sync>;

/// A loader bound to its call-time arguments.
pub type BoundLoad = Arc<dyn Fn() -> BoxFuture<'static, LoadResult> + Send + Sync>;

/// Wrap an async closure as a [`LoadFn`].
pub fn load_fn<F, Fut>(f: F) -> LoadFn
where
    F: Fn(LoadContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LoadResult> + Send + 'static,
{
    Arc::new(move |ctx: LoadContext| f(ctx).boxed())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderOptions {
    /// Only run on the client, including the first client-side load.
    #[serde(default)]
    pub client: bool,
    /// Only run on the server.
    #[serde(default)]
    pub server: bool,
    /// Loaders of inner routes wait for this one, which in turn waits for
    /// everything declared before it.
    #[serde(default)]
    pub blocking: bool,
    /// Like `blocking`, but only relative to loaders of the same component.
    #[serde(default)]
    pub blocking_sibling: bool,
}

impl LoaderOptions {
    pub fn client() -> Self {
        Self {
            client: true,
            ..Default::default()
        }
    }

    pub fn server() -> Self {
        Self {
            server: true,
            ..Default::default()
        }
    }

    pub fn blocking() -> Self {
        Self {
            blocking: true,
            ..Default::default()
        }
    }

    pub fn blocking_sibling() -> Self {
        Self {
            blocking_sibling: true,
            ..Default::default()
        }
    }

    /// The options as they apply given the global rendering switch; with
    /// SSR disabled, every loader becomes a client loader.
    pub fn frozen(self, ssr: bool) -> Self {
        if ssr {
            self
        } else {
            Self {
                client: true,
                server: false,
                ..self
            }
        }
    }
}

/// A loader with its options.
///
/// The load is generic so that declared ([`LoadFn`]) and bound
/// ([`BoundLoad`]) loaders share the same filtering and folding.
#[derive(Clone)]
pub struct Loader<T = LoadFn> {
    pub load: T,
    pub options: LoaderOptions,
}

impl<T> Loader<T> {
    pub fn new(load: T, options: LoaderOptions) -> Self {
        Self { load, options }
    }

    fn map<U>(self, f: impl FnOnce(T) -> U) -> Loader<U> {
        Loader {
            load: f(self.load),
            options: self.options,
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Loader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("load", &self.load)
            .field("options", &self.options)
            .finish()
    }
}

/// The loader declaration of a single route component.
#[derive(Clone)]
pub enum LoaderSpec {
    /// A bare function, with default options.
    Func(LoadFn),
    Single(Loader),
    Many(Vec<Loader>),
}

impl LoaderSpec {
    pub fn normalize(self) -> Vec<Loader> {
        match self {
            Self::Func(load) => vec![Loader::new(load, LoaderOptions::default())],
            Self::Single(loader) => vec![loader],
            Self::Many(loaders) => loaders,
        }
    }
}

impl From<LoadFn> for LoaderSpec {
    fn from(load: LoadFn) -> Self {
        Self::Func(load)
    }
}

impl From<Loader> for LoaderSpec {
    fn from(loader: Loader) -> Self {
        Self::Single(loader)
    }
}

impl From<Vec<Loader>> for LoaderSpec {
    fn from(loaders: Vec<Loader>) -> Self {
        Self::Many(loaders)
    }
}

/// Normalize the declarations of a route chain, outer to inner.
pub fn normalize_loaders(specs: impl IntoIterator<Item = LoaderSpec>) -> Vec<Vec<Loader>> {
    specs.into_iter().map(LoaderSpec::normalize).collect()
}

/// Select the loaders that apply to the current environment.
///
/// A loader is dropped if it is client-only on the server, server-only on
/// the client, or not client-marked on the initial client-side load (as the
/// server already ran it).  Groups left empty are dropped entirely.
pub fn filter_loaders<T>(
    groups: Vec<Vec<Loader<T>>>,
    server: bool,
    initial_client_load: bool,
) -> Vec<Vec<Loader<T>>> {
    groups
        .into_iter()
        .map(|group| {
            group
                .into_iter()
                .filter(|Loader { options, .. }| {
                    !((options.client && server)
                        || (options.server && !server)
                        || (initial_client_load && !options.client))
                })
                .collect::<Vec<_>>()
        })
        .filter(|group| !group.is_empty())
        .collect()
}

/// The call-time arguments injected into every loader.
#[derive(Clone, Debug)]
pub struct LoadContext {
    pub location: Location,
    pub params: HashMap<String, String>,
    pub store: ContextStore,
    pub cookies: CookieJar,
    pub token: LoadingToken,
    /// Application supplied context, from the settings.
    pub custom: Arc<serde_json::Value>,
}

impl LoadContext {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Signal a redirect from within a loader.
    ///
    /// This records the redirect on the current loading token and cancels
    /// it, so that no other loader result of this navigation is used and
    /// the redirect is followed even when a sibling's failure settles
    /// first; return the value with `?` or `Err` to unwind the chain.
    pub fn redirect(&self, redirect: impl Into<Redirect>) -> NavError {
        let redirect = redirect.into();
        self.token.redirect_to(redirect.clone());
        NavError::Redirect(redirect)
    }
}

/// Bind every loader to the context, freezing the options against the
/// global rendering switch.
pub fn bind_loaders(
    groups: Vec<Vec<Loader>>,
    ctx: &LoadContext,
    ssr: bool,
) -> Vec<Vec<Loader<BoundLoad>>> {
    groups
        .into_iter()
        .map(|group| {
            group
                .into_iter()
                .map(|loader| {
                    let ctx = ctx.clone();
                    let mut bound = loader.map(|load| -> BoundLoad {
                        Arc::new(move || load(ctx.clone()))
                    });
                    bound.options = bound.options.frozen(ssr);
                    bound
                })
                .collect()
        })
        .collect()
}
