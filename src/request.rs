//! The logged HTTP request record and its collection encoding.

use chrono::{DateTime, Utc};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::id::{now_utc, RecordId};

const PAIR_SEPARATOR: &str = ";";
const KEY_VALUE_SEPARATOR: char = '=';

// Characters that would break the `name=value;name=value` layout.
const RESERVED: &AsciiSet = &CONTROLS.add(b'%').add(b';').add(b'=');

// An empty list item. A bare `%` never appears in escaped text.
const EMPTY_ITEM: &str = "%";

/// Ordered collection of name/value pairs (cookies, form values, query string,
/// server variables).
///
/// Stored as `name=value` pairs joined by `;` with no trailing separator. Reserved
/// characters inside names and values are percent-encoded so decoding is exact.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameValues(Vec<(String, String)>);

impl NameValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pair, keeping any earlier pair with the same name.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Returns the first value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Serializes the collection to its `name=value;name=value` form.
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|(name, value)| format!("{}{KEY_VALUE_SEPARATOR}{}", escape(name), escape(value)))
            .collect::<Vec<_>>()
            .join(PAIR_SEPARATOR)
    }

    /// Parses the output of [`NameValues::encode`].
    ///
    /// A pair without `=` decodes to an empty value.
    pub fn decode(encoded: &str) -> Result<Self> {
        if encoded.is_empty() {
            return Ok(Self::default());
        }
        encoded
            .split(PAIR_SEPARATOR)
            .map(|pair| {
                let (name, value) = pair.split_once(KEY_VALUE_SEPARATOR).unwrap_or((pair, ""));
                Ok((unescape(name)?, unescape(value)?))
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NameValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Joins a list with `;`, escaping reserved characters in every item.
///
/// Empty items are written as [`EMPTY_ITEM`], so the output never ends in a
/// separator and `[""]` stays distinct from `[]`.
pub(crate) fn encode_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| match item.as_str() {
            "" => EMPTY_ITEM.to_string(),
            item => escape(item),
        })
        .collect::<Vec<_>>()
        .join(PAIR_SEPARATOR)
}

pub(crate) fn decode_list(encoded: &str) -> Result<Vec<String>> {
    if encoded.is_empty() {
        return Ok(Vec::new());
    }
    encoded
        .split(PAIR_SEPARATOR)
        .map(|item| match item {
            EMPTY_ITEM => Ok(String::new()),
            item => unescape(item),
        })
        .collect()
}

fn escape(s: &str) -> String {
    utf8_percent_encode(s, RESERVED).to_string()
}

fn unescape(s: &str) -> Result<String> {
    percent_decode_str(s)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|e| Error::Decode(e.to_string()))
}

/// One logged HTTP request/response pair.
///
/// Values are built by [`crate::RequestLog::create_request`] and never mutated by
/// the store once logged. Every accessor on a store hands out an owned copy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub id: RecordId,
    /// Application scope, assigned by the owning log.
    pub application_name: String,
    /// Session the request was correlated to, if the host had session context.
    pub session_id: Option<RecordId>,
    pub host: String,
    pub user: Option<String>,
    pub time_utc: DateTime<Utc>,

    pub accept_types: Vec<String>,
    pub content_type: String,
    pub content_encoding: String,
    pub cookies: NameValues,
    pub form: NameValues,
    pub query_string: NameValues,
    pub server_variables: NameValues,
    pub http_method: String,
    pub url: String,
    pub user_agent: Option<String>,
    pub user_host_address: Option<String>,
    pub user_host_name: Option<String>,
    pub total_bytes: i64,
    pub is_authenticated: bool,
    pub is_local: bool,
    pub is_secure_connection: bool,

    pub response_content_type: String,
    pub response_content_encoding: String,
    pub response_cookies: NameValues,
    pub response_status: String,
    pub handler_type: Option<String>,
}

impl ResourceRequest {
    /// Captures the request described by `ctx`.
    pub fn from_context(
        ctx: &RequestContext,
        application_name: &str,
        session_id: Option<RecordId>,
    ) -> Self {
        let request = &ctx.request;
        let response = &ctx.response;
        Self {
            id: RecordId::new(),
            application_name: application_name.to_string(),
            session_id,
            host: ctx.host.clone(),
            user: ctx.user.clone(),
            time_utc: now_utc(),
            accept_types: request.accept_types.clone(),
            content_type: request.content_type.clone(),
            content_encoding: request.content_encoding.clone(),
            cookies: request.cookies.clone(),
            form: request.form.clone(),
            query_string: request.query_string.clone(),
            server_variables: request.server_variables.clone(),
            http_method: request.http_method.clone(),
            url: request.url.clone(),
            user_agent: request.user_agent.clone(),
            user_host_address: request.user_host_address.clone(),
            user_host_name: request.user_host_name.clone(),
            total_bytes: request.total_bytes,
            is_authenticated: ctx.is_authenticated,
            is_local: request.is_local,
            is_secure_connection: request.is_secure_connection,
            response_content_type: response.content_type.clone(),
            response_content_encoding: response.content_encoding.clone(),
            response_cookies: response.cookies.clone(),
            response_status: response.status.clone(),
            handler_type: response.handler_type.clone(),
        }
    }
}
