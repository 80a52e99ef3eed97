use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;

use crate::{error::LoadError, location::Redirect};

type CancelHook = Box<dyn FnOnce() + Send>;

/// The per-navigation cancellation and status record.
///
/// Exactly one token is current at any time; starting a navigation
/// supersedes the previous one, cancelling it if it is still pending.
/// Cancellation is cooperative: the loader chain polls [`is_cancelled`](
/// Self::is_cancelled) between steps, and hooks registered through
/// [`on_cancel`](Self::on_cancel) are invoked as a best-effort hint for
/// underlying I/O that is able to abort.
#[derive(Clone, Default)]
pub struct LoadingToken {
    inner: Arc<TokenInner>,
}

#[derive(Default)]
struct TokenInner {
    pending: AtomicBool,
    cancelled: AtomicBool,
    error: Mutex<Option<LoadError>>,
    redirect: Mutex<Option<Redirect>>,
    hooks: Mutex<Vec<CancelHook>>,
}

impl LoadingToken {
    /// A fresh token for a navigation about to start loading.
    pub fn pending() -> Self {
        let token = Self::default();
        token.inner.pending.store(true, Ordering::SeqCst);
        token
    }

    pub fn is_pending(&self) -> bool {
        self.inner.pending.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Cancel this token.  Returns `false` if it was already cancelled.
    pub fn cancel(&self) -> bool {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return false;
        }
        let hooks = std::mem::take(&mut *self.inner.hooks.lock());
        for hook in hooks {
            hook();
        }
        true
    }

    /// Register a hook to run on cancellation; runs immediately should
    /// the token already be cancelled.
    pub fn on_cancel(&self, hook: impl FnOnce() + Send + 'static) {
        if self.is_cancelled() {
            hook();
            return;
        }
        self.inner.hooks.lock().push(Box::new(hook));
        // a cancel racing the push above would have missed the hook
        if self.is_cancelled() {
            let hooks = std::mem::take(&mut *self.inner.hooks.lock());
            for hook in hooks {
                hook();
            }
        }
    }

    /// Mark the navigation owning this token as settled.
    pub(crate) fn settle(&self) {
        self.inner.pending.store(false, Ordering::SeqCst);
        self.inner.hooks.lock().clear();
    }

    pub(crate) fn fail(&self, error: LoadError) {
        *self.inner.error.lock() = Some(error);
        self.settle();
    }

    /// Record a redirect raised while loading and cancel the token.  The
    /// first redirect wins.
    pub(crate) fn redirect_to(&self, redirect: Redirect) {
        self.inner.redirect.lock().get_or_insert(redirect);
        self.cancel();
    }

    /// The redirect raised by a loader of this navigation, if any.
    pub fn redirect(&self) -> Option<Redirect> {
        self.inner.redirect.lock().clone()
    }

    /// The error retained from a failed navigation, for inspection by a
    /// loading indicator.
    pub fn error(&self) -> Option<LoadError> {
        self.inner.error.lock().clone()
    }

    pub fn same(&self, other: &LoadingToken) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for LoadingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadingToken")
            .field("pending", &self.is_pending())
            .field("cancelled", &self.is_cancelled())
            .field("error", &self.error())
            .field("redirect", &self.redirect())
            .finish()
    }
}
