//! This crate provides server-side rendering (SSR) aware page navigation,
//! data loading and metadata management for applications built with the
//! Leptos frameworks.  Routes declare asynchronous loaders that fetch the
//! data their page needs, and the [`Navigator`] coordinates matching a
//! location to its routes, running those loaders in a partially parallel,
//! partially sequential order, committing the result, and keeping the
//! document's `<title>` and `<meta>` tags in step with the page.
//!
//! ## Use case
//!
//! A page is typically made of an outer (root) route, e.g. the application
//! shell needing the current user, and an inner (leaf) route, e.g. a blog
//! post needing its content.  Both should start loading at once, unless one
//! depends on the other, in which case the dependent loader has to wait.
//! On the server, everything must be loaded before the markup is streamed
//! so hydration on the client starts from identical data; on the client,
//! a navigation superseded by another one must never commit its results,
//! and going back to a list from the detail page opened from it should
//! not load the list again.
//!
//! The pieces addressing this are:
//!
//! - [`loader`], normalizing the per-route loader declarations, selecting
//!   the ones for the current environment and folding them into an
//!   execution [`Plan`](loader::Plan) according to their `blocking` and
//!   `blocking_sibling` options.
//! - [`LoadingToken`], the per-navigation cancellation record that ensures
//!   at most one navigation's results are committed.
//! - [`InstantBackChain`], tracking the back/forward transitions which may
//!   replay already loaded pages.
//! - [`meta`], merging the default, root and leaf meta, normalizing the
//!   shorthand keys to tags and patching the document minimally.
//! - [`Navigator`], orchestrating all of the above.
//!
//! # Example
//!
//! ```
//! use futures::{future::BoxFuture, FutureExt};
//! use leptos_ssr_nav::{
//!     loader::{load_fn, Props},
//!     Environment, Location, MatchedRoute, NavError, Navigator, Outcome, RouteMatch,
//!     RouteMatcher,
//! };
//! use serde_json::json;
//!
//! struct Routes;
//!
//! impl RouteMatcher for Routes {
//!     fn match_routes<'a>(
//!         &'a self,
//!         _location: &'a Location,
//!     ) -> BoxFuture<'a, Result<RouteMatch, NavError>> {
//!         async move {
//!             let greet = load_fn(|ctx| async move {
//!                 let mut props = Props::new();
//!                 props.insert(
//!                     "greeting".to_string(),
//!                     json!(format!("hello from {}", ctx.location.pathname)),
//!                 );
//!                 Ok(Some(props))
//!             });
//!             Ok(RouteMatch {
//!                 routes: vec![MatchedRoute::new("/").with_load(greet)],
//!                 route_indices: vec![0],
//!                 ..Default::default()
//!             })
//!         }
//!         .boxed()
//!     }
//! }
//!
//! let navigator = Navigator::builder(Routes)
//!     .environment(Environment::Server)
//!     .build()?;
//! let outcome = tokio_test::block_on(navigator.navigate(Location::from_path("/")))?;
//! assert_eq!(outcome, Outcome::Loaded);
//! let page = navigator.page().expect("page committed");
//! assert_eq!(page.props["greeting"], "hello from /");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The documentation under individual modules and types goes further into
//! the ordering and cancellation rules, please check them out.
//!
//! # Feature Flags
#![cfg_attr(
    feature = "document-features",
    cfg_attr(doc, doc = ::document_features::document_features!())
)]

pub mod cookies;
pub mod error;
pub mod instant;
pub mod loader;
pub mod location;
pub mod meta;
pub mod navigation;
#[cfg(feature = "ssr")]
pub mod server;
pub mod settings;
pub mod store;
mod token;


pub use cookies::CookieJar;
pub use error::{LoadError, NavError, StructuralError};
pub use instant::{ChainEntry, InstantBackChain};
pub use location::{HistoryAction, Location, Redirect};
pub use meta::{MetaDocument, MetaManager};
pub use navigation::{
    Environment, ErrorDisposition, HistoryEntry, MatchedRoute, NavState, NavigationEvent,
    NavigationEvents, NavigationKind, Navigator, Outcome, PageData, RouteMatch, RouteMatcher,
    RoutePosition,
};
pub use settings::Settings;
pub use store::ContextStore;
pub use token::LoadingToken;
