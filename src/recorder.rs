//! Hooks a host calls on inbound requests and authentication events.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::id::RecordId;
use crate::selector::{LogSelector, UnitOfWork};

/// Path segment prefix of the request log's own administrative endpoints.
pub const ADMIN_PATH_PREFIX: &str = "request-log";

/// Records requests and new sessions through the active log of each unit of work.
///
/// Requests aimed at the administrative endpoints are never recorded.
#[derive(Clone, Debug)]
pub struct RequestRecorder {
    selector: Arc<LogSelector>,
    admin_prefix: String,
}

impl RequestRecorder {
    pub fn new(selector: Arc<LogSelector>) -> Self {
        Self {
            selector,
            admin_prefix: ADMIN_PATH_PREFIX.to_string(),
        }
    }

    /// Changes the prefix identifying administrative path segments.
    pub fn with_admin_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.admin_prefix = prefix.into();
        self
    }

    pub fn selector(&self) -> &Arc<LogSelector> {
        &self.selector
    }

    /// `true` if any path segment of `url` starts, ignoring ASCII case, with the
    /// admin prefix.
    pub fn is_admin_request(&self, url: &str) -> bool {
        let prefix = self.admin_prefix.as_str();
        let path = url.split(['?', '#']).next().unwrap_or_default();
        path.split('/').any(|segment| {
            segment
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        })
    }

    /// Logs the request of `unit` and returns its id.
    ///
    /// Returns `Ok(None)` for administrative requests.
    pub async fn on_request(&self, unit: &mut UnitOfWork) -> Result<Option<RecordId>> {
        if self.is_admin_request(&unit.context().request.url) {
            return Ok(None);
        }

        let log = self.selector.get_or_create_active_log(unit).await?;
        let request = log.create_request(unit.context()).await?;
        let id = log.log_request(&request).await?;
        Ok(Some(id))
    }

    /// Logs a session for the client of `unit` if its token has not been seen yet.
    ///
    /// Returns the new session's id, or `Ok(None)` when there is no token, the
    /// session is already known, or the request is administrative.
    pub async fn on_authenticate(&self, unit: &mut UnitOfWork) -> Result<Option<RecordId>> {
        if self.is_admin_request(&unit.context().request.url) {
            return Ok(None);
        }
        let Some(token) = unit.context().session_token().map(str::to_string) else {
            return Ok(None);
        };

        let log = self.selector.get_or_create_active_log(unit).await?;
        if !log.is_new_session(&token).await? {
            debug!(%token, "session already known");
            return Ok(None);
        }

        let session = log.create_session(unit.context());
        let id = log.log_session(&session).await?;
        Ok(Some(id))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::context::RequestContext;
    use crate::memory_log::{MemoryRequestLog, MemoryStore};
    use crate::RequestLog;

    fn recorder(store: &Arc<MemoryStore>) -> RequestRecorder {
        let selector = LogSelector::new(&HashMap::new()).with_memory_store(Arc::clone(store));
        RequestRecorder::new(Arc::new(selector))
    }

    fn unit(url: &str, token: Option<&str>) -> UnitOfWork {
        let mut ctx = RequestContext::new();
        ctx.application_path = Some("/shop".into());
        ctx.request.url = url.into();
        ctx.session_token = token.map(str::to_string);
        UnitOfWork::new(ctx)
    }

    #[test]
    fn admin_requests_are_recognized() {
        let recorder = recorder(&Arc::new(MemoryStore::default()));
        assert!(recorder.is_admin_request("/request-log/list"));
        assert!(recorder.is_admin_request("/app/Request-Log.axd?page=2"));
        assert!(recorder.is_admin_request("http://example.com/REQUEST-LOGS/"));
        assert!(!recorder.is_admin_request("/products/request"));
        assert!(!recorder.is_admin_request("/search?q=request-log"));
        assert!(!recorder.is_admin_request(""));
    }

    #[tokio::test]
    async fn admin_requests_are_not_logged() {
        let store = Arc::new(MemoryStore::default());
        let recorder = recorder(&store);

        let mut admin = unit("/request-log/details", Some("t"));
        assert_eq!(recorder.on_request(&mut admin).await.unwrap(), None);
        assert_eq!(recorder.on_authenticate(&mut admin).await.unwrap(), None);

        let log = MemoryRequestLog::new(store).with_application_name("/shop").unwrap();
        let mut out = Vec::new();
        assert_eq!(log.get_requests(0, 10, &mut out).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn requests_sharing_a_token_share_one_session() {
        let store = Arc::new(MemoryStore::default());
        let recorder = recorder(&store);

        let mut first = unit("/cart", Some("abc"));
        let session = recorder.on_authenticate(&mut first).await.unwrap();
        assert!(session.is_some());
        let first_request = recorder.on_request(&mut first).await.unwrap().unwrap();

        let mut second = unit("/checkout", Some("abc"));
        assert_eq!(recorder.on_authenticate(&mut second).await.unwrap(), None);
        let second_request = recorder.on_request(&mut second).await.unwrap().unwrap();

        let log = MemoryRequestLog::new(store).with_application_name("/shop").unwrap();
        for id in [first_request, second_request] {
            let request = log.get_request(&id.to_string()).await.unwrap().unwrap();
            assert_eq!(request.session_id, session);
        }
    }

    #[tokio::test]
    async fn fallback_parameter_identifies_the_session() {
        let store = Arc::new(MemoryStore::default());
        let recorder = recorder(&store);

        let mut unit = unit("/home", None);
        unit.context_mut()
            .request
            .query_string
            .push(crate::context::FALLBACK_SESSION_PARAM, "from-query");
        let id = recorder.on_authenticate(&mut unit).await.unwrap().unwrap();

        let log = MemoryRequestLog::new(store).with_application_name("/shop").unwrap();
        assert_eq!(log.find_session("from-query").await.unwrap(), Some(id));
    }

    #[tokio::test]
    async fn no_token_means_no_session() {
        let recorder = recorder(&Arc::new(MemoryStore::default()));
        let mut unit = unit("/home", None);
        assert_eq!(recorder.on_authenticate(&mut unit).await.unwrap(), None);

        let id = recorder.on_request(&mut unit).await.unwrap().unwrap();
        let log = unit.active_log().unwrap();
        let request = log.get_request(&id.to_string()).await.unwrap().unwrap();
        assert_eq!(request.session_id, None);
    }
}
