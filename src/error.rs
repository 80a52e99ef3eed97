use std::fmt;

use thiserror::Error;

use crate::location::Redirect;

/// A failure reported by a loader.
///
/// This carries an optional HTTP status, which the server request handler
/// uses as the response status of the generic error page.
#[derive(Clone, Debug, Error, PartialEq)]
#[error(
    "load failed{}: {message}",
    .status.map(|status| format!(" ({status})")).unwrap_or_default()
)]
pub struct LoadError {
    message: String,
    status: Option<u16>,
}

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(message, 404)
    }

    /// Wrap any displayable error, typically from an HTTP client.
    pub fn from_error(error: impl fmt::Display) -> Self {
        Self::new(error.to_string())
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

/// Misconfiguration of routes, loaders or settings.
///
/// These are never recovered from internally.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StructuralError {
    #[error("parallel step without any members in loader chain")]
    EmptyParallel,
    #[error("`load` declared on route `{path}` which is neither the root nor the leaf route")]
    MisplacedLoader { path: String },
    #[error("`meta` declared on route `{path}` which is neither the root nor the leaf route")]
    MisplacedMeta { path: String },
    #[error("no routes matched `{pathname}`")]
    EmptyMatch { pathname: String },
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

/// The outcome of a loader or navigation that did not produce data.
///
/// A redirect is an expected alternate outcome rather than a failure; it
/// unwinds the current chain walk and is resolved by the navigator (on the
/// client) or the request handler (on the server).
#[derive(Clone, Debug, Error, PartialEq)]
pub enum NavError {
    #[error("redirect to `{}`", .0.location)]
    Redirect(Redirect),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error("navigation exceeded the limit of {0} redirects")]
    TooManyRedirects(usize),
}

impl NavError {
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::Redirect(Redirect::new(location))
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect(_))
    }
}

impl From<Redirect> for NavError {
    fn from(redirect: Redirect) -> Self {
        Self::Redirect(redirect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        assert_eq!(LoadError::new("boom").to_string(), "load failed: boom");
        assert_eq!(
            LoadError::not_found("gone").to_string(),
            "load failed (404): gone"
        );
        assert_eq!(
            NavError::redirect("/login").to_string(),
            "redirect to `/login`"
        );
    }

    #[test]
    fn load_error_converts() {
        let err: NavError = LoadError::with_status("nope", 403).into();
        assert!(matches!(err, NavError::Load(ref e) if e.status() == Some(403)));
        assert!(!err.is_redirect());
    }
}
