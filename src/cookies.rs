use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;

/// Cookie accessor handed to loaders.
///
/// Under SSR, the jar is seeded from the request's `Cookie` header, and
/// every cookie set while loading is captured so the request handler can
/// replay it onto the response as `Set-Cookie` headers.
#[derive(Clone, Debug, Default)]
pub struct CookieJar {
    inner: Arc<Mutex<JarInner>>,
}

#[derive(Debug, Default)]
struct JarInner {
    values: HashMap<String, String>,
    captured: Vec<String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a `Cookie` request header value, e.g. `a=1; b=2`.
    pub fn from_header(header: &str) -> Self {
        let values = header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.split_once('=')?;
                let name = name.trim();
                (!name.is_empty()).then(|| (name.to_string(), value.trim().to_string()))
            })
            .collect();
        Self {
            inner: Arc::new(Mutex::new(JarInner {
                values,
                captured: Vec::new(),
            })),
        }
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.inner.lock().values.get(name).cloned()
    }

    /// Set a cookie; `attributes` is appended verbatim to the captured
    /// `Set-Cookie` value (e.g. `Path=/; HttpOnly`).
    pub fn set(&self, name: &str, value: &str, attributes: Option<&str>) {
        let mut inner = self.inner.lock();
        inner.values.insert(name.to_string(), value.to_string());
        let header = match attributes {
            Some(attributes) if !attributes.is_empty() => {
                format!("{name}={value}; {attributes}")
            }
            _ => format!("{name}={value}"),
        };
        inner.captured.push(header);
    }

    /// The `Set-Cookie` header values captured so far, in order.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.inner.lock().captured.clone()
    }
}
