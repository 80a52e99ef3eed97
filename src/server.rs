//! Server-side request handling.
//!
//! [`handle_request`] runs a navigation for the requested path in the
//! server environment and maps the outcome to what the HTTP layer has to
//! send: the rendered page with its head and state snapshot, a redirect,
//! or the generic error page.  Cookies set by loaders are carried on every
//! response.

use std::fmt::Write;

use leptos::logging::{error, log};
use serde_json::{json, Value};

use crate::{
    error::{NavError, StructuralError},
    location::Location,
    navigation::{Environment, Navigator, Outcome, PageData},
    settings::Settings,
};

/// Revives ISO-8601 timestamps of the state snapshot into `Date` objects.
pub const DATE_REVIVER: &str = concat!(
    "<script>window.__reviveDates=function(k,v){",
    r#"return typeof v==="string"&&"#,
    r"/^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})$/.test(v)",
    "?new Date(v):v};</script>",
);

#[derive(Clone, Debug, PartialEq)]
pub enum ResponseBody {
    Page {
        page: PageData,
        /// Markup for the document `<head>`.
        head: String,
        /// The state snapshot, to be placed before the client bundle.
        state: String,
    },
    Redirect {
        location: String,
    },
    Error {
        html: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServerResponse {
    pub status: u16,
    pub body: ResponseBody,
    pub set_cookies: Vec<String>,
}

impl ServerResponse {
    fn new(navigator: &Navigator, status: u16, body: ResponseBody) -> Self {
        Self {
            status,
            body,
            set_cookies: navigator.cookies().set_cookie_headers(),
        }
    }

    fn error(navigator: &Navigator, status: u16) -> Self {
        Self::new(
            navigator,
            status,
            ResponseBody::Error {
                html: error_page(status),
            },
        )
    }
}

/// Render the response for `path`.
///
/// Misconfiguration of the routes or the navigator is returned as an error
/// rather than rendered, as no page of the application could succeed.
pub async fn handle_request(
    navigator: &Navigator,
    path: &str,
) -> Result<ServerResponse, StructuralError> {
    if navigator.environment() != Environment::Server {
        return Err(StructuralError::InvalidSettings(
            "requests must be handled by a server navigator".to_string(),
        ));
    }
    let location = Location::from_path(path).with_key("server");
    let response = match navigator.navigate(location).await {
        Ok(Outcome::Handled) => {
            let status = navigator
                .current_token()
                .and_then(|token| token.error())
                .and_then(|error| error.status())
                .unwrap_or(500);
            ServerResponse::error(navigator, status)
        }
        Ok(outcome) if outcome.is_committed() => match navigator.page() {
            Some(page) => {
                let head = navigator
                    .meta()
                    .map(|meta| meta.render_head())
                    .unwrap_or_default();
                let state = state_script(&snapshot(&page), navigator.settings());
                ServerResponse::new(navigator, 200, ResponseBody::Page { page, head, state })
            }
            None => ServerResponse::error(navigator, 500),
        },
        Ok(outcome) => {
            error!("server navigation to `{path}` ended as {outcome:?}");
            ServerResponse::error(navigator, 500)
        }
        Err(NavError::Redirect(redirect)) => {
            log!("redirecting `{path}` to `{}`", redirect.location);
            ServerResponse::new(
                navigator,
                redirect.status_code(),
                ResponseBody::Redirect {
                    location: redirect.location,
                },
            )
        }
        Err(NavError::Load(error)) => ServerResponse::error(navigator, error.status().unwrap_or(500)),
        Err(NavError::TooManyRedirects(_)) => ServerResponse::error(navigator, 500),
        Err(NavError::Structural(error)) => return Err(error),
    };
    Ok(response)
}

/// The state handed to the client for hydration.
pub fn snapshot(page: &PageData) -> Value {
    json!({
        "location": page.location,
        "route": page.route,
        "params": page.params,
        "props": page.props,
    })
}

/// Embed `state` as a JSON `<script>` element.
///
/// The JSON is kept within ASCII, and `<`, `>` and `&` are escaped so that
/// no string value may close the element.
pub fn state_script(state: &Value, settings: &Settings) -> String {
    let mut out = format!(
        r#"<script id="{}" type="application/json">{}</script>"#,
        settings.state_id,
        escape_script_json(&state.to_string()),
    );
    if settings.date_reviver {
        out.push_str(DATE_REVIVER);
    }
    out
}

/// Escape serialized JSON for embedding into an HTML `<script>` element.
///
/// The escaped characters may only appear inside JSON strings, where the
/// `\uXXXX` form is equivalent.
pub fn escape_script_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        match ch {
            '<' | '>' | '&' => {
                let _ = write!(out, "\\u{:04x}", ch as u32);
            }
            ch if ch.is_ascii() => out.push(ch),
            ch => {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{unit:04x}");
                }
            }
        }
    }
    out
}

/// A minimal generic error page.
pub fn error_page(status: u16) -> String {
    let reason = match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        410 => "Gone",
        503 => "Service Unavailable",
        500.. => "Internal Server Error",
        _ => "Error",
    };
    format!(
        "<!DOCTYPE html><html><head><title>{status} {reason}</title></head>\
         <body><h1>{status} {reason}</h1></body></html>"
    )
}
