//! The request log contract shared by every backing store.

use std::fmt::Debug;
use std::sync::OnceLock;

use async_trait::async_trait;

use crate::browsers::BrowserUsage;
use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::id::RecordId;
use crate::request::ResourceRequest;
use crate::session::Session;

/// Server variable holding the host's application identifier.
const APPLICATION_PATH_VARIABLE: &str = "APPL_MD_PATH";

/// A store capable of recording and retrieving requests and sessions.
///
/// Implementations scope every record to their [`application_name`](Self::application_name)
/// and must behave identically from the caller's point of view: records handed out
/// are owned copies, pages are in descending time order, and absence is reported
/// as `Ok(None)` rather than an error.
#[async_trait]
pub trait RequestLog: Debug + Send + Sync {
    /// Human readable name of the store, for display only.
    fn name(&self) -> &str;

    /// Application scope of this log. Empty until initialized.
    fn application_name(&self) -> &str;

    /// Initializes the application scope.
    ///
    /// Fails with [`Error::InvalidOperation`] once a non-empty name has been set.
    fn set_application_name(&self, name: &str) -> Result<()>;

    /// Builds a session for the client of `ctx` without persisting it.
    fn create_session(&self, ctx: &RequestContext) -> Session {
        Session::from_context(ctx, self.application_name())
    }

    /// Builds a request for `ctx` without persisting it.
    ///
    /// When the context carries a session token that has no session yet, a new
    /// session is created and logged first so the request can reference it.
    async fn create_request(&self, ctx: &RequestContext) -> Result<ResourceRequest> {
        let session_id = match ctx.session_token() {
            Some(token) => match self.find_session(token).await? {
                Some(id) => Some(id),
                None => {
                    let session = self.create_session(ctx);
                    Some(self.log_session(&session).await?)
                }
            },
            None => None,
        };
        Ok(ResourceRequest::from_context(
            ctx,
            self.application_name(),
            session_id,
        ))
    }

    /// Persists a session and returns its id.
    ///
    /// If a session with the same external token already exists in this scope, the
    /// existing id is returned and nothing is written.
    async fn log_session(&self, session: &Session) -> Result<RecordId>;

    /// Persists a request and returns its id.
    async fn log_request(&self, request: &ResourceRequest) -> Result<RecordId>;

    /// Looks up the session correlated to an external token.
    async fn find_session(&self, external_token: &str) -> Result<Option<RecordId>>;

    /// `true` iff no session with this external token exists in this scope yet.
    async fn is_new_session(&self, external_token: &str) -> Result<bool> {
        Ok(self.find_session(external_token).await?.is_none())
    }

    /// Fetches a request by id.
    async fn get_request(&self, id: &str) -> Result<Option<ResourceRequest>>;

    /// Fetches a session by id.
    async fn get_session(&self, id: &str) -> Result<Option<Session>>;

    /// Appends page `page_index` of `page_size` requests, newest first, to `out`
    /// and returns the total number of requests in scope.
    async fn get_requests(
        &self,
        page_index: i64,
        page_size: i64,
        out: &mut Vec<ResourceRequest>,
    ) -> Result<u64>;

    /// Requests grouped by `(browser, major version)` of their session, most
    /// frequent first.
    async fn series_browsers_by_request(&self) -> Result<Vec<BrowserUsage>>;
}

/// Write-once application name shared by log implementations.
#[derive(Debug, Default)]
pub struct ApplicationName {
    value: OnceLock<String>,
    max_len: Option<usize>,
}

impl ApplicationName {
    pub fn new() -> Self {
        Self::default()
    }

    /// An application name limited to `max_len` characters.
    pub fn bounded(max_len: usize) -> Self {
        Self {
            value: OnceLock::new(),
            max_len: Some(max_len),
        }
    }

    pub fn get(&self) -> &str {
        self.value.get().map(String::as_str).unwrap_or_default()
    }

    pub fn is_initialized(&self) -> bool {
        self.value.get().is_some()
    }

    pub fn max_len(&self) -> Option<usize> {
        self.max_len
    }

    /// Sets the name. An empty name leaves the value uninitialized.
    pub fn set(&self, name: &str) -> Result<()> {
        if self.is_initialized() {
            return Err(reset_error());
        }
        if let Some(max) = self.max_len {
            let len = name.chars().count();
            if len > max {
                return Err(Error::invalid_argument(
                    "application_name",
                    format!("{len} characters exceeds the maximum of {max}"),
                ));
            }
        }
        if name.is_empty() {
            return Ok(());
        }
        self.value.set(name.to_string()).map_err(|_| reset_error())
    }
}

fn reset_error() -> Error {
    Error::InvalidOperation("the application name cannot be reset once initialized".into())
}

/// Derives an application name from the host context.
///
/// Uses the `APPL_MD_PATH` server variable, then the application path, then `/`.
pub fn infer_application_name(ctx: &RequestContext) -> String {
    ctx.request
        .server_variables
        .get(APPLICATION_PATH_VARIABLE)
        .or(ctx.application_path.as_deref())
        .filter(|name| !name.is_empty())
        .unwrap_or("/")
        .to_string()
}

/// Validates paging arguments, returning them as `(offset, limit)`.
pub(crate) fn page_bounds(page_index: i64, page_size: i64) -> Result<(u64, u64)> {
    if page_index < 0 {
        return Err(Error::OutOfRange {
            name: "page_index",
            value: page_index,
        });
    }
    if page_size < 0 {
        return Err(Error::OutOfRange {
            name: "page_size",
            value: page_size,
        });
    }
    let (index, size) = (page_index as u64, page_size as u64);
    Ok((index.saturating_mul(size), size))
}
