use serde::{Deserialize, Serialize};

/// The history action that produced a [`Location`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HistoryAction {
    #[default]
    Push,
    Replace,
    Pop,
}

/// An immutable descriptor of a navigated-to URL.
///
/// Two locations refer to the same page iff their `pathname` is equal; a
/// change to only the query string or the hash is not a page change.  This
/// means navigating to the identical pathname again (e.g. clicking the link
/// of a filtered list one is already on) is indistinguishable from a no-op.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub pathname: String,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub delta: isize,
    #[serde(default)]
    pub action: HistoryAction,
    /// Set by navigations which may later be reverted by an instant
    /// back/forward replay.
    #[serde(default)]
    pub instant_back: bool,
    /// Set by navigations that only change state and must not load.
    #[serde(default)]
    pub instant: bool,
}

impl Location {
    /// Parse a path such as `/search?q=rust#top` into a location.
    pub fn from_path(path: &str) -> Self {
        let (rest, hash) = match path.find('#') {
            Some(i) => (&path[..i], &path[i..]),
            None => (path, ""),
        };
        let (pathname, search) = match rest.find('?') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };
        let pathname = if pathname.is_empty() { "/" } else { pathname };
        Self {
            pathname: pathname.to_string(),
            search: search.to_string(),
            hash: hash.to_string(),
            ..Default::default()
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_action(mut self, action: HistoryAction, delta: isize) -> Self {
        self.action = action;
        self.delta = delta;
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    pub fn instant_back(mut self) -> Self {
        self.instant_back = true;
        self
    }

    pub fn instant(mut self) -> Self {
        self.instant = true;
        self
    }

    pub fn is_same_page(&self, other: &Location) -> bool {
        self.pathname == other.pathname
    }

    /// The full path including the query string and the hash.
    pub fn path(&self) -> String {
        format!("{}{}{}", self.pathname, self.search, self.hash)
    }

    /// The location a redirect away from `self` lands on.
    ///
    /// The redirect replaces the current history entry, so it keeps the
    /// index while taking a fresh key.
    pub fn redirected(&self, redirect: &Redirect, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            index: self.index,
            delta: 0,
            action: HistoryAction::Replace,
            ..Self::from_path(&redirect.location)
        }
    }
}

/// The target of a redirect signal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl Redirect {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            status: None,
        }
    }

    pub fn with_status(location: impl Into<String>, status: u16) -> Self {
        Self {
            location: location.into(),
            status: Some(status),
        }
    }

    /// The HTTP status a server responds with, `302` unless declared.
    pub fn status_code(&self) -> u16 {
        self.status.unwrap_or(302)
    }
}

impl From<&str> for Redirect {
    fn from(location: &str) -> Self {
        Redirect::new(location)
    }
}

impl From<String> for Redirect {
    fn from(location: String) -> Self {
        Redirect::new(location)
    }
}
