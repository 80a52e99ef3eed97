//! The per-navigation orchestrator.
//!
//! A [`Navigator`] is created per browser tab, or per request under SSR.
//! Each call to [`Navigator::navigate`] goes through
//! `Idle → Navigating → {Committed | Cancelled | Failed}`:
//!
//! - A back/forward transition between two locations of the instant-back
//!   chain replays the cached page without loading.
//! - Otherwise the matched routes' loaders run under a fresh
//!   [`LoadingToken`], superseding (and cancelling) the token of any
//!   navigation still pending, so that at most one navigation's results
//!   are ever committed.
//! - A redirect raised while loading cancels the token and, on the client,
//!   re-enters the navigation for the new target; on the server it is
//!   returned to the request handler.
//! - A failure leaves the previous page in place, retains the error on
//!   the token and dispatches [`NavigationEvent::Failed`].
//! - A superseded or cancelled navigation silently resolves to
//!   [`Outcome::Cancelled`].

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use futures::future::BoxFuture;
use leptos::{
    logging::{error, log, warn},
    prelude::{provide_context, use_context},
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::{
    cookies::CookieJar,
    error::{LoadError, NavError, StructuralError},
    instant::InstantBackChain,
    loader::{
        bind_loaders, combine_loaders, execute, filter_loaders, merge_props, normalize_loaders,
        LoadContext, LoaderSpec, Props,
    },
    location::{HistoryAction, Location, Redirect},
    meta::{MetaArgs, MetaFn, MetaManager, MetaMap},
    settings::Settings,
    store::ContextStore,
    token::LoadingToken,
};

/// Where the navigator runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Server,
    Client,
}

impl Default for Environment {
    fn default() -> Self {
        if cfg!(feature = "ssr") {
            Self::Server
        } else {
            Self::Client
        }
    }
}

/// A route of a matched route chain.
#[derive(Clone)]
pub struct MatchedRoute {
    pub path: String,
    pub load: Option<LoaderSpec>,
    pub meta: Option<MetaFn>,
}

impl MatchedRoute {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            load: None,
            meta: None,
        }
    }

    pub fn with_load(mut self, load: impl Into<LoaderSpec>) -> Self {
        self.load = Some(load.into());
        self
    }

    pub fn with_meta(mut self, meta: MetaFn) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl fmt::Debug for MatchedRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchedRoute")
            .field("path", &self.path)
            .field("load", &self.load.is_some())
            .field("meta", &self.meta.is_some())
            .finish()
    }
}

/// The routes matched for a location, outer (root) to inner (leaf).
#[derive(Clone, Debug, Default)]
pub struct RouteMatch {
    pub routes: Vec<MatchedRoute>,
    pub params: HashMap<String, String>,
    pub route_indices: Vec<usize>,
}

impl RouteMatch {
    /// The full matched path, e.g. `/users/:id`.
    pub fn route_path(&self) -> String {
        let segments = self
            .routes
            .iter()
            .map(|route| route.path.trim_matches('/'))
            .filter(|path| !path.is_empty())
            .collect::<Vec<_>>();
        format!("/{}", segments.join("/"))
    }

    /// Only the root and the leaf route may declare loaders and meta.
    pub fn validate(&self, pathname: &str) -> Result<(), StructuralError> {
        let Some(last) = self.routes.len().checked_sub(1) else {
            return Err(StructuralError::EmptyMatch {
                pathname: pathname.to_string(),
            });
        };
        for route in self.routes.iter().take(last).skip(1) {
            if route.load.is_some() {
                return Err(StructuralError::MisplacedLoader {
                    path: route.path.clone(),
                });
            }
            if route.meta.is_some() {
                return Err(StructuralError::MisplacedMeta {
                    path: route.path.clone(),
                });
            }
        }
        Ok(())
    }

    fn root(&self) -> Option<&MatchedRoute> {
        self.routes.first()
    }

    fn leaf(&self) -> Option<&MatchedRoute> {
        (self.routes.len() > 1).then(|| self.routes.last()).flatten()
    }
}

/// The router collaborator, resolving a location to its routes.
pub trait RouteMatcher: Send + Sync {
    fn match_routes<'a>(
        &'a self,
        location: &'a Location,
    ) -> BoxFuture<'a, Result<RouteMatch, NavError>>;
}

/// Lifecycle events dispatched to the application.
#[derive(Clone, Debug, PartialEq)]
pub enum NavigationEvent {
    Started(Location),
    Resolved(Location),
    /// Emitted after the first client-side navigation when SSR is
    /// disabled, as no resolve from a server render ever happened.
    SyntheticResolved(Location),
    Failed {
        location: Location,
        error: LoadError,
    },
}

pub trait NavigationEvents: Send + Sync {
    fn dispatch(&self, event: NavigationEvent);
}

impl<F> NavigationEvents for F
where
    F: Fn(NavigationEvent) + Send + Sync,
{
    fn dispatch(&self, event: NavigationEvent) {
        self(event)
    }
}

/// What the application's error hook decided about a load failure.
#[derive(Clone, Debug, PartialEq)]
pub enum ErrorDisposition {
    /// The hook dealt with the failure itself, e.g. by showing a notice.
    Handled,
    Redirect(Redirect),
    Unhandled,
}

pub type ErrorHook = Arc<dyn Fn(&LoadError, &Location) -> ErrorDisposition + Send + Sync>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NavState {
    #[default]
    Idle,
    Navigating,
    Committed,
    Cancelled,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationKind {
    Start,
    Back,
    Forward,
    Push,
    Redirect,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub route: String,
    pub action: NavigationKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoutePosition {
    Root,
    Leaf,
}

/// A committed page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageData {
    pub location: Location,
    pub route: String,
    pub route_indices: Vec<usize>,
    pub params: HashMap<String, String>,
    pub props: Props,
    pub root_meta: MetaMap,
    pub leaf_meta: MetaMap,
}

impl PageData {
    pub fn meta(&self, position: RoutePosition) -> &MetaMap {
        match position {
            RoutePosition::Root => &self.root_meta,
            RoutePosition::Leaf => &self.leaf_meta,
        }
    }
}

/// How a navigation concluded without error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Loaders ran and the page was committed.
    Loaded,
    /// An instant back/forward transition restored a cached page.
    Replayed,
    /// An instant navigation committed without loading.
    Instant,
    /// Only the query string or hash changed.
    Unchanged,
    /// The error hook handled a load failure; the previous page stays.
    Handled,
    /// Superseded or cancelled; nothing was committed.
    Cancelled,
}

impl Outcome {
    pub fn is_committed(&self) -> bool {
        !matches!(self, Self::Handled | Self::Cancelled)
    }
}

const TOKEN: &str = "token";
const LOCATION: &str = "location";
const PAGE: &str = "page";
const CACHE: &str = "cache";
const HISTORY: &str = "history";
const CHAIN: &str = "instant-chain";
const HYDRATED: &str = "hydrated";
const STARTED: &str = "started";

struct NavigatorInner {
    settings: Settings,
    environment: Environment,
    store: ContextStore,
    router: Arc<dyn RouteMatcher>,
    events: Option<Arc<dyn NavigationEvents>>,
    error_hook: Option<ErrorHook>,
    meta: Option<MetaManager>,
    cookies: CookieJar,
    state: watch::Sender<NavState>,
    next_key: AtomicU64,
}

/// Coordinates navigations; cheap to clone.
#[derive(Clone)]
pub struct Navigator {
    inner: Arc<NavigatorInner>,
}

pub struct NavigatorBuilder {
    settings: Settings,
    environment: Environment,
    store: ContextStore,
    router: Arc<dyn RouteMatcher>,
    events: Option<Arc<dyn NavigationEvents>>,
    error_hook: Option<ErrorHook>,
    meta: Option<MetaManager>,
    cookies: CookieJar,
}

impl NavigatorBuilder {
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn store(mut self, store: ContextStore) -> Self {
        self.store = store;
        self
    }

    pub fn events(mut self, events: impl NavigationEvents + 'static) -> Self {
        self.events = Some(Arc::new(events));
        self
    }

    pub fn error_hook(
        mut self,
        hook: impl Fn(&LoadError, &Location) -> ErrorDisposition + Send + Sync + 'static,
    ) -> Self {
        self.error_hook = Some(Arc::new(hook));
        self
    }

    pub fn meta(mut self, meta: MetaManager) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn cookies(mut self, cookies: CookieJar) -> Self {
        self.cookies = cookies;
        self
    }

    pub fn build(self) -> Result<Navigator, StructuralError> {
        self.settings.validate()?;
        let (state, _) = watch::channel(NavState::Idle);
        Ok(Navigator {
            inner: Arc::new(NavigatorInner {
                settings: self.settings,
                environment: self.environment,
                store: self.store,
                router: self.router,
                events: self.events,
                error_hook: self.error_hook,
                meta: self.meta,
                cookies: self.cookies,
                state,
                next_key: AtomicU64::new(0),
            }),
        })
    }
}

impl Navigator {
    pub fn builder(router: impl RouteMatcher + 'static) -> NavigatorBuilder {
        NavigatorBuilder {
            settings: Settings::default(),
            environment: Environment::default(),
            store: ContextStore::new(),
            router: Arc::new(router),
            events: None,
            error_hook: None,
            meta: None,
            cookies: CookieJar::new(),
        }
    }

    pub fn provide(&self) {
        provide_context(self.clone());
    }

    pub fn from_context() -> Option<Self> {
        use_context::<Self>()
    }

    fn key(&self, name: &str) -> String {
        format!("{}{name}", self.inner.settings.persistent_prefix)
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub fn environment(&self) -> Environment {
        self.inner.environment
    }

    pub fn store(&self) -> &ContextStore {
        &self.inner.store
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.inner.cookies
    }

    pub fn meta(&self) -> Option<&MetaManager> {
        self.inner.meta.as_ref()
    }

    pub fn state(&self) -> NavState {
        *self.inner.state.borrow()
    }

    /// Watch the navigation state, e.g. from a loading indicator.
    pub fn subscribe(&self) -> watch::Receiver<NavState> {
        self.inner.state.subscribe()
    }

    pub fn location(&self) -> Option<Location> {
        self.inner.store.get(&self.key(LOCATION))
    }

    pub fn page(&self) -> Option<PageData> {
        self.inner.store.get(&self.key(PAGE))
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner
            .store
            .get(&self.key(HISTORY))
            .unwrap_or_default()
    }

    pub fn instant_chain(&self) -> InstantBackChain {
        self.inner.store.get(&self.key(CHAIN)).unwrap_or_default()
    }

    pub fn current_token(&self) -> Option<LoadingToken> {
        self.inner.store.get(&self.key(TOKEN))
    }

    /// Cancel the navigation in flight, if any.
    pub fn cancel(&self) -> bool {
        self.current_token()
            .filter(LoadingToken::is_pending)
            .is_some_and(|token| token.cancel())
    }

    /// Seed the props rendered by the server, merged under the results of
    /// the initial client-side load.
    pub fn hydrate(&self, props: Props) {
        self.inner.store.set(self.key(HYDRATED), props);
    }

    /// Forget every instant-back transition, e.g. on a hard reload.
    pub fn reset_instant_chain(&self) {
        self.inner
            .store
            .update::<InstantBackChain, _>(&self.key(CHAIN), InstantBackChain::reset);
    }

    fn fresh_key(&self) -> String {
        format!("nav-{}", self.inner.next_key.fetch_add(1, Ordering::SeqCst))
    }

    fn set_state(&self, state: NavState) {
        self.inner.state.send_replace(state);
    }

    fn dispatch(&self, event: NavigationEvent) {
        if let Some(events) = &self.inner.events {
            events.dispatch(event);
        }
    }

    /// Install a new current token, returning the one it supersedes.
    fn replace_token(&self, token: LoadingToken) -> Option<LoadingToken> {
        let previous = self.current_token();
        self.inner.store.set(self.key(TOKEN), token);
        previous
    }

    fn is_current(&self, token: &LoadingToken) -> bool {
        self.current_token()
            .is_some_and(|current| current.same(token))
    }

    /// Navigate to `location`, following redirects on the client.
    pub async fn navigate(&self, location: Location) -> Result<Outcome, NavError> {
        let limit = self.inner.settings.max_redirects;
        let mut target = location;
        let mut redirected = false;
        let mut redirects = 0;
        loop {
            match self.navigate_once(target.clone(), redirected).await {
                Err(NavError::Redirect(redirect))
                    if self.inner.environment == Environment::Client =>
                {
                    redirects += 1;
                    if redirects > limit {
                        warn!("giving up on `{}` after {limit} redirects", target.path());
                        self.set_state(NavState::Failed);
                        return Err(NavError::TooManyRedirects(limit));
                    }
                    log!("redirecting `{}` to `{}`", target.path(), redirect.location);
                    target = target.redirected(&redirect, self.fresh_key());
                    redirected = true;
                }
                result => return result,
            }
        }
    }

    async fn navigate_once(
        &self,
        to: Location,
        redirected: bool,
    ) -> Result<Outcome, NavError> {
        let previous = self.location();
        // the first navigation started, whether or not it ever commits
        let first = !self.inner.store.contains(&self.key(STARTED));
        self.inner.store.set(self.key(STARTED), true);

        let token = LoadingToken::pending();
        if let Some(superseded) = self.replace_token(token.clone()) {
            if superseded.is_pending() && !superseded.is_cancelled() {
                warn!("navigation to `{}` supersedes a pending navigation", to.path());
                superseded.cancel();
            }
        }
        self.set_state(NavState::Navigating);
        self.dispatch(NavigationEvent::Started(to.clone()));

        if let Some(previous) = &previous {
            if !redirected && previous.is_same_page(&to) {
                return Ok(self.commit_location(&token, to));
            }
            if to.action == HistoryAction::Pop
                && self.instant_chain().is_instant_transition(previous, &to)
            {
                if let Some(page) = self.cached_page(&to.key) {
                    self.inner
                        .store
                        .update::<InstantBackChain, _>(&self.key(CHAIN), |chain| {
                            chain.update_index(&to)
                        });
                    let page = PageData {
                        location: to.clone(),
                        ..page
                    };
                    return Ok(self.commit(&token, page, Outcome::Replayed, false, redirected));
                }
            }
            if to.instant {
                if let Some(page) = self.page() {
                    let page = PageData {
                        location: to.clone(),
                        ..page
                    };
                    return Ok(self.commit(&token, page, Outcome::Instant, false, redirected));
                }
            }
        }

        let result = self.load(&to, &token, first).await;

        if !self.is_current(&token) {
            token.settle();
            return Ok(Outcome::Cancelled);
        }
        if let Some(redirect) = token.redirect() {
            token.settle();
            self.set_state(NavState::Cancelled);
            return Err(NavError::Redirect(redirect));
        }
        match result {
            Err(NavError::Redirect(redirect)) => {
                token.cancel();
                token.settle();
                self.set_state(NavState::Cancelled);
                Err(NavError::Redirect(redirect))
            }
            Err(NavError::Load(_)) | Ok(_) if token.is_cancelled() => {
                token.settle();
                self.set_state(NavState::Cancelled);
                Ok(Outcome::Cancelled)
            }
            Ok(page) => Ok(self.commit(&token, page, Outcome::Loaded, first, redirected)),
            Err(NavError::Load(error)) => self.fail(&token, to, error),
            Err(error) => {
                token.settle();
                self.set_state(NavState::Failed);
                Err(error)
            }
        }
    }

    async fn load(
        &self,
        to: &Location,
        token: &LoadingToken,
        first: bool,
    ) -> Result<PageData, NavError> {
        let inner = &self.inner;
        let matched = inner.router.match_routes(to).await?;
        matched.validate(&to.pathname)?;

        let ctx = LoadContext {
            location: to.clone(),
            params: matched.params.clone(),
            store: inner.store.clone(),
            cookies: inner.cookies.clone(),
            token: token.clone(),
            custom: Arc::new(inner.settings.context.clone()),
        };
        let server = inner.environment == Environment::Server;
        let initial_client_load = !server && first && inner.settings.ssr;

        let groups = normalize_loaders(matched.routes.iter().filter_map(|route| route.load.clone()));
        let groups = bind_loaders(groups, &ctx, inner.settings.ssr);
        let plan = combine_loaders(filter_loaders(groups, server, initial_client_load));
        let is_cancelled = || token.is_cancelled();
        let mut props = execute(&plan, &is_cancelled).await?;

        if initial_client_load {
            let key = self.key(HYDRATED);
            let hydrated = inner.store.get::<Props>(&key);
            inner.store.remove(&key);
            props = merge_props(hydrated, props);
        }
        let props = props.unwrap_or_default();

        let args = MetaArgs {
            store: &inner.store,
            props: &props,
            location: to,
        };
        let root_meta = compute_meta(matched.root(), &args);
        let leaf_meta = compute_meta(matched.leaf(), &args);

        Ok(PageData {
            location: to.clone(),
            route: matched.route_path(),
            route_indices: matched.route_indices,
            params: matched.params,
            props,
            root_meta,
            leaf_meta,
        })
    }

    fn fail(
        &self,
        token: &LoadingToken,
        to: Location,
        error: LoadError,
    ) -> Result<Outcome, NavError> {
        let disposition = match &self.inner.error_hook {
            Some(hook) => hook(&error, &to),
            None => ErrorDisposition::Unhandled,
        };
        match disposition {
            ErrorDisposition::Redirect(redirect) => {
                token.cancel();
                token.settle();
                self.set_state(NavState::Cancelled);
                Err(NavError::Redirect(redirect))
            }
            ErrorDisposition::Handled => {
                token.fail(error);
                self.set_state(match self.location() {
                    Some(_) => NavState::Committed,
                    None => NavState::Idle,
                });
                Ok(Outcome::Handled)
            }
            ErrorDisposition::Unhandled => {
                error!("navigation to `{}` failed: {error}", to.path());
                token.fail(error.clone());
                self.set_state(NavState::Failed);
                self.dispatch(NavigationEvent::Failed {
                    location: to,
                    error: error.clone(),
                });
                Err(NavError::Load(error))
            }
        }
    }

    fn cached_page(&self, key: &str) -> Option<PageData> {
        self.inner
            .store
            .get::<HashMap<String, PageData>>(&self.key(CACHE))
            .and_then(|mut cache| cache.remove(key))
    }

    /// Commit a query or hash change of the current page.
    fn commit_location(&self, token: &LoadingToken, to: Location) -> Outcome {
        let store = &self.inner.store;
        if let Some(mut page) = self.page() {
            page.location = to.clone();
            store.set(self.key(PAGE), page);
        }
        store.set(self.key(LOCATION), to.clone());
        token.settle();
        self.set_state(NavState::Committed);
        self.dispatch(NavigationEvent::Resolved(to));
        Outcome::Unchanged
    }

    fn commit(
        &self,
        token: &LoadingToken,
        page: PageData,
        outcome: Outcome,
        first: bool,
        redirected: bool,
    ) -> Outcome {
        let inner = &self.inner;
        let store = &inner.store;
        let to = page.location.clone();
        let kind = navigation_kind(first, redirected, &to);

        let previous_page = self.page();
        let first_commit = self.location().is_none();
        store.update::<InstantBackChain, _>(&self.key(CHAIN), |chain| match outcome {
            Outcome::Replayed => (),
            _ if to.instant_back => {
                if let Some(previous) = &previous_page {
                    chain.add(
                        &to,
                        &previous.location,
                        &page.route_indices,
                        &previous.route_indices,
                    );
                }
            }
            _ if to.instant => (),
            _ => chain.reset(),
        });
        let keep = {
            let chain = self.instant_chain();
            chain
                .keys()
                .into_iter()
                .map(str::to_string)
                .chain([to.key.clone()])
                .collect::<HashSet<_>>()
        };
        store.update::<HashMap<String, PageData>, _>(&self.key(CACHE), |cache| {
            cache.insert(to.key.clone(), page.clone());
            cache.retain(|key, _| keep.contains(key));
        });
        store.update::<Vec<HistoryEntry>, _>(&self.key(HISTORY), |history| {
            history.push(HistoryEntry {
                route: page.route.clone(),
                action: kind,
            })
        });

        if let Some(meta) = &inner.meta {
            meta.set_root(page.root_meta.clone());
            meta.set_leaf(page.leaf_meta.clone());
        }
        store.set(self.key(LOCATION), to.clone());
        store.set(self.key(PAGE), page);
        store.clear_all_except(&inner.settings.persistent_prefix);

        token.settle();
        self.set_state(NavState::Committed);
        log!("navigated to `{}` ({kind:?})", to.path());
        self.dispatch(NavigationEvent::Resolved(to.clone()));
        if first_commit && inner.environment == Environment::Client && !inner.settings.ssr {
            self.dispatch(NavigationEvent::SyntheticResolved(to));
        }
        outcome
    }
}

fn compute_meta(route: Option<&MatchedRoute>, args: &MetaArgs<'_>) -> MetaMap {
    route
        .and_then(|route| route.meta.as_ref())
        .map(|meta| meta(args))
        .unwrap_or_default()
}

fn navigation_kind(first: bool, redirected: bool, to: &Location) -> NavigationKind {
    if redirected {
        NavigationKind::Redirect
    } else if first {
        NavigationKind::Start
    } else if to.action == HistoryAction::Pop {
        if to.delta > 0 {
            NavigationKind::Forward
        } else {
            NavigationKind::Back
        }
    } else {
        NavigationKind::Push
    }
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("environment", &self.inner.environment)
            .field("state", &self.state())
            .field("location", &self.location())
            .finish()
    }
}
