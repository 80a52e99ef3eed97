//! Page `<title>` and `<meta>` management.
//!
//! The root route and the leaf route each declare their meta as a
//! shorthand object (see [`normalize_meta`] for the recognized keys).  The
//! [`MetaManager`] tracks both separately so either can be recomputed on
//! its own, merges them over the default meta and reconciles the result
//! with a [`MetaDocument`] through a minimal patch.

mod apply;
mod head;
mod merge;
mod normalize;

use std::sync::Arc;

use leptos::prelude::{provide_context, use_context};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{loader::Props, location::Location, store::ContextStore};

pub use apply::{apply_meta, MetaDocument, MetaPatch};
pub use head::{render_tag, HeadTags, TagId};
pub use merge::{exclude_current_locale, merge_meta};
pub use normalize::{escape_html, normalize_meta};

/// A shorthand meta object, keys in declaration order.
pub type MetaMap = serde_json::Map<String, serde_json::Value>;

/// A single `(name, value)` meta tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTag {
    pub name: String,
    pub value: String,
}

impl MetaTag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// What a meta function gets to select from.
pub struct MetaArgs<'a> {
    pub store: &'a ContextStore,
    pub props: &'a Props,
    pub location: &'a Location,
}

/// A route component's meta declaration.
pub type MetaFn = Arc<dyn Fn(&MetaArgs<'_>) -> MetaMap + Send + Sync>;

pub fn meta_fn<F>(f: F) -> MetaFn
where
    F: Fn(&MetaArgs<'_>) -> MetaMap + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Default)]
struct MetaState {
    base: MetaMap,
    root: MetaMap,
    leaf: MetaMap,
}

/// Shared holder of the root and leaf meta of the current page.
#[derive(Clone, Default)]
pub struct MetaManager {
    inner: Arc<Mutex<MetaState>>,
}

impl MetaManager {
    pub fn new(base: MetaMap) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MetaState {
                base,
                ..Default::default()
            })),
        }
    }

    pub fn provide(&self) {
        provide_context(self.clone());
    }

    pub fn from_context() -> Option<Self> {
        use_context::<Self>()
    }

    pub fn set_root(&self, meta: MetaMap) {
        self.inner.lock().root = meta;
    }

    pub fn set_leaf(&self, meta: MetaMap) {
        self.inner.lock().leaf = meta;
    }

    /// Recompute the root meta, leaving the leaf meta untouched.
    pub fn compute_root(&self, meta: Option<&MetaFn>, args: &MetaArgs<'_>) {
        self.set_root(meta.map(|f| f(args)).unwrap_or_default());
    }

    /// Recompute the leaf meta, leaving the root meta untouched.
    pub fn compute_leaf(&self, meta: Option<&MetaFn>, args: &MetaArgs<'_>) {
        self.set_leaf(meta.map(|f| f(args)).unwrap_or_default());
    }

    pub fn merged(&self) -> MetaMap {
        let state = self.inner.lock();
        merge_meta(&state.base, &state.root, &state.leaf)
    }

    pub fn title(&self) -> Option<String> {
        self.merged()
            .get("title")
            .and_then(|title| title.as_str())
            .map(str::to_string)
    }

    pub fn tags(&self) -> Vec<MetaTag> {
        normalize_meta(&self.merged())
    }

    /// Patch the document to the current meta.
    pub fn apply<D: MetaDocument>(&self, document: &mut D) -> MetaPatch {
        let merged = self.merged();
        let title = merged.get("title").and_then(|title| title.as_str());
        apply_meta(document, title, &normalize_meta(&merged))
    }

    /// The head markup for a server-rendered shell.
    pub fn render_head(&self) -> String {
        let merged = self.merged();
        let mut head = HeadTags::new();
        if let Some(charset) = merged.get("charset").and_then(|charset| charset.as_str()) {
            head.add_meta_tag("charset", charset);
        }
        let title = merged.get("title").and_then(|title| title.as_str());
        apply_meta(&mut head, title, &normalize_meta(&merged));
        head.render()
    }
}
