//! Tracking of back/forward transitions that may replay already loaded
//! pages rather than running their loaders again.
//!
//! The typical case is opening a detail page from a list and going back
//! to the list: if the navigation into the detail page was marked
//! `instant_back`, the list is restored from the state cached when it was
//! committed.

use leptos::logging::warn;

use crate::location::Location;

/// An entry of the instant-back chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainEntry {
    pub key: String,
    /// Indices of the matched routes, identifying the kind of page.
    pub routes: Vec<usize>,
}

/// The chain of location keys navigable without reloading.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstantBackChain {
    entries: Vec<ChainEntry>,
    index: Option<usize>,
}

impl InstantBackChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.key.as_str()).collect()
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.key == key)
    }

    /// Record an instant-back navigation from `previous` to `next`.
    pub fn add(
        &mut self,
        next: &Location,
        previous: &Location,
        next_routes: &[usize],
        previous_routes: &[usize],
    ) {
        let previous_entry = ChainEntry {
            key: previous.key.clone(),
            routes: previous_routes.to_vec(),
        };
        if self.entries.is_empty() {
            self.entries.push(previous_entry);
        } else if let Some(i) = self.position(&previous.key) {
            // anything newer than `previous` belongs to an abandoned branch
            self.entries.truncate(i + 1);
        } else {
            warn!(
                "instant-back chain lost track of location `{}`, restarting chain",
                previous.key
            );
            self.entries.clear();
            self.entries.push(previous_entry);
        }

        if let Some(i) = self
            .entries
            .iter()
            .position(|entry| entry.routes == next_routes)
        {
            // revisiting the same kind of page restarts the window
            self.entries.drain(..=i);
        }

        self.entries.push(ChainEntry {
            key: next.key.clone(),
            routes: next_routes.to_vec(),
        });
        self.index = Some(self.entries.len() - 1);
    }

    /// Whether a transition between the two locations can replay cached
    /// state, regardless of its direction.
    pub fn is_instant_transition(&self, from: &Location, to: &Location) -> bool {
        self.contains(&from.key) && self.contains(&to.key)
    }

    /// Move the current index to the entry of `location` after an instant
    /// transition.  Returns `false` (resetting the chain) if it is not
    /// part of the chain.
    pub fn update_index(&mut self, location: &Location) -> bool {
        match self.position(&location.key) {
            Some(i) => {
                self.index = Some(i);
                true
            }
            None => {
                warn!(
                    "location `{}` missing from instant-back chain, resetting",
                    location.key
                );
                self.reset();
                false
            }
        }
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.index = None;
    }
}
