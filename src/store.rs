//! The process- or tab-wide key-value store.
//!
//! All state that must outlive a single call but must not leak across
//! unrelated navigations is registered here, so that teardown is
//! centralized.  Keys are plain strings; each key has a single writer by
//! convention, and modules owning a key only expose the function allowed
//! to write it.

use std::{any::Any, collections::HashMap, fmt, sync::Arc};

use leptos::prelude::{provide_context, use_context};
use parking_lot::RwLock;

type Slot = Box<dyn Any + Send + Sync>;

/// A cheaply cloneable handle to a shared key-value store.
#[derive(Clone, Default)]
pub struct ContextStore {
    inner: Arc<RwLock<HashMap<String, Slot>>>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide this store as a context for the enclosing view tree.
    pub fn provide(&self) {
        provide_context(self.clone());
    }

    /// Acquire the store provided by a parent, if any.
    ///
    /// As this uses [`use_context`] underneath, it should be called at the
    /// component's top level.
    pub fn from_context() -> Option<Self> {
        use_context::<Self>()
    }

    /// Returns a clone of the value under `key` if present with type `T`.
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + 'static,
    {
        self.inner
            .read()
            .get(key)
            .and_then(|slot| slot.downcast_ref::<T>())
            .cloned()
    }

    pub fn set<T>(&self, key: impl Into<String>, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.inner.write().insert(key.into(), Box::new(value));
    }

    /// Mutate the value under `key` in place, starting from the default
    /// should it be absent (or hold a value of another type).
    pub fn update<T, R>(&self, key: &str, f: impl FnOnce(&mut T) -> R) -> R
    where
        T: Default + Send + Sync + 'static,
    {
        let mut map = self.inner.write();
        let slot = map
            .entry(key.to_string())
            .or_insert_with(|| Box::new(T::default()));
        if let Some(value) = slot.downcast_mut::<T>() {
            return f(value);
        }
        let mut value = T::default();
        let result = f(&mut value);
        *slot = Box::new(value);
        result
    }

    pub fn remove(&self, key: &str) -> bool {
        self.inner.write().remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.read().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys = self.inner.read().keys().cloned().collect::<Vec<_>>();
        keys.sort();
        keys
    }

    /// Drop everything, e.g. when a new tab session starts.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Drop every key not starting with `prefix`, e.g. at the boundary of
    /// a navigation.
    pub fn clear_all_except(&self, prefix: &str) {
        self.inner.write().retain(|key, _| key.starts_with(prefix));
    }
}

impl fmt::Debug for ContextStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextStore")
            .field("keys", &self.keys())
            .finish()
    }
}
