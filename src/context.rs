//! Ambient description of an in-flight request, populated by the host.
//!
//! The interception layer fills a [`RequestContext`] from whatever web framework it
//! runs in. Logs only ever read from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::request::NameValues;

/// Request parameter consulted for a session token when the host has no session
/// mechanism of its own.
pub const FALLBACK_SESSION_PARAM: &str = "session_id";

/// Everything the host knows about the current request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Name of the machine handling the request.
    pub host: String,
    pub user: Option<String>,
    pub is_authenticated: bool,
    /// The host framework's own session identifier.
    pub session_token: Option<String>,
    /// Root path of the application, used to infer an application name.
    pub application_path: Option<String>,
    pub request: HttpRequestInfo,
    pub response: HttpResponseInfo,
    pub browser: BrowserCapabilities,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequestInfo {
    pub http_method: String,
    pub url: String,
    pub accept_types: Vec<String>,
    pub content_type: String,
    pub content_encoding: String,
    pub cookies: NameValues,
    pub form: NameValues,
    pub query_string: NameValues,
    pub server_variables: NameValues,
    pub user_agent: Option<String>,
    pub user_host_address: Option<String>,
    pub user_host_name: Option<String>,
    pub total_bytes: i64,
    pub is_local: bool,
    pub is_secure_connection: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponseInfo {
    pub content_type: String,
    pub content_encoding: String,
    pub cookies: NameValues,
    /// Status line, e.g. `200 OK`.
    pub status: String,
    pub handler_type: Option<String>,
}

/// Client capabilities detected by the host.
///
/// Only `browser` and `major_version` are interpreted (by the browser usage
/// report). Everything else is an opaque attribute.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserCapabilities {
    pub browser: String,
    pub major_version: i32,
    pub attributes: BTreeMap<String, String>,
}

impl RequestContext {
    /// Creates an empty context for the local machine.
    pub fn new() -> Self {
        Self {
            host: machine_name(),
            ..Default::default()
        }
    }

    /// Token correlating this request to a session.
    ///
    /// Prefers the host's session identifier and falls back to the
    /// [`FALLBACK_SESSION_PARAM`] request parameter (form first, then query string).
    pub fn session_token(&self) -> Option<&str> {
        self.session_token
            .as_deref()
            .or_else(|| self.request.form.get(FALLBACK_SESSION_PARAM))
            .or_else(|| self.request.query_string.get(FALLBACK_SESSION_PARAM))
            .filter(|token| !token.is_empty())
    }
}

fn machine_name() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "localhost".to_string())
}
