use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::browsers::{self, BrowserUsage};
use crate::error::{Error, Result};
use crate::id::RecordId;
use crate::log::{page_bounds, ApplicationName, RequestLog};
use crate::request::ResourceRequest;
use crate::session::Session;

/// A fixed-capacity, insertion-ordered store of requests and sessions held in
/// process memory.
///
/// One `MemoryStore` is built at application startup and shared, through an
/// [`Arc`], by every [`MemoryRequestLog`] in the process. When a ring is full the
/// oldest entry is evicted unconditionally, regardless of how often it was read.
///
/// All access goes through a single reader/writer lock: lookups and paging share
/// it, logging holds it exclusively.
#[derive(Debug)]
pub struct MemoryStore {
    capacity: usize,
    entries: RwLock<Entries>,
}

impl MemoryStore {
    /// The largest capacity a store may be created with.
    pub const MAXIMUM_SIZE: usize = 500;

    /// Capacity used when none is configured.
    pub const DEFAULT_SIZE: usize = 15;

    /// Creates a store holding at most `capacity` requests (and as many sessions).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `capacity` exceeds [`MemoryStore::MAXIMUM_SIZE`].
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity > Self::MAXIMUM_SIZE {
            return Err(Error::invalid_argument(
                "size",
                format!(
                    "size must be between 0 and {}, got {capacity}",
                    Self::MAXIMUM_SIZE
                ),
            ));
        }
        Ok(Self::with_capacity(capacity))
    }

    /// Creates a store, clamping `size` into `[0, MAXIMUM_SIZE]`.
    pub fn clamped(size: i64) -> Self {
        Self::with_capacity(size.clamp(0, Self::MAXIMUM_SIZE as i64) as usize)
    }

    /// The number of requests the store keeps before evicting the oldest.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn with_capacity(capacity: usize) -> Self {
        if capacity == 0 {
            warn!("memory request store has zero capacity, every record will be discarded");
        }
        Self {
            capacity,
            entries: RwLock::new(Entries::new(capacity)),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_SIZE)
    }
}

#[derive(Debug)]
struct Entries {
    requests: Ring<ResourceRequest>,
    sessions: Sessions,
}

impl Entries {
    fn new(capacity: usize) -> Self {
        Self {
            requests: Ring::new(capacity),
            sessions: Sessions::new(capacity),
        }
    }

    /// Stores a request, keeping its session alive while the request is stored.
    fn insert_request(&mut self, request: ResourceRequest) {
        if self.requests.capacity == 0 {
            return;
        }
        if let Some(session_id) = request.session_id {
            self.sessions.retain(&session_id);
        }
        let evicted = self.requests.push(request.id, request);
        if let Some(session_id) = evicted.and_then(|evicted| evicted.session_id) {
            self.sessions.release(&session_id);
        }
    }
}

/// Sessions of the store.
///
/// A session lives as long as a stored request references it. Sessions no request
/// references yet are evicted oldest first once more than `capacity` of them wait.
#[derive(Debug)]
struct Sessions {
    capacity: usize,
    items: HashMap<RecordId, Session>,
    // number of stored requests referencing each session
    refs: HashMap<RecordId, usize>,
    // unreferenced sessions, oldest first
    pending: VecDeque<RecordId>,
    // (application name, external token) -> session id
    tokens: HashMap<(String, String), RecordId>,
}

impl Sessions {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: HashMap::new(),
            refs: HashMap::new(),
            pending: VecDeque::with_capacity(capacity),
            tokens: HashMap::new(),
        }
    }

    fn contains(&self, id: &RecordId) -> bool {
        self.items.contains_key(id)
    }

    fn get(&self, id: &RecordId) -> Option<&Session> {
        self.items.get(id)
    }

    fn find(&self, application_name: &str, token: &str) -> Option<RecordId> {
        self.tokens
            .get(&(application_name.to_string(), token.to_string()))
            .copied()
    }

    fn insert(&mut self, session: Session) {
        if self.capacity == 0 {
            return;
        }
        if self.pending.len() == self.capacity {
            if let Some(oldest) = self.pending.pop_front() {
                self.remove(&oldest);
            }
        }
        let id = session.id;
        self.tokens.insert(
            (
                session.application_name.clone(),
                session.external_session_token.clone(),
            ),
            id,
        );
        self.items.insert(id, session);
        self.pending.push_back(id);
    }

    fn retain(&mut self, id: &RecordId) {
        if !self.items.contains_key(id) {
            return;
        }
        let refs = self.refs.entry(*id).or_default();
        *refs += 1;
        if *refs == 1 {
            self.pending.retain(|pending| pending != id);
        }
    }

    fn release(&mut self, id: &RecordId) {
        let Some(refs) = self.refs.get_mut(id) else {
            return;
        };
        *refs -= 1;
        if *refs == 0 {
            self.refs.remove(id);
            self.remove(id);
        }
    }

    fn remove(&mut self, id: &RecordId) {
        if let Some(session) = self.items.remove(id) {
            let key = (session.application_name, session.external_session_token);
            if self.tokens.get(&key) == Some(id) {
                self.tokens.remove(&key);
            }
        }
    }
}

/// FIFO ring keyed by record id.
#[derive(Debug)]
struct Ring<T> {
    capacity: usize,
    order: VecDeque<RecordId>,
    items: HashMap<RecordId, T>,
}

impl<T> Ring<T> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            items: HashMap::with_capacity(capacity),
        }
    }

    fn contains(&self, id: &RecordId) -> bool {
        self.items.contains_key(id)
    }

    fn get(&self, id: &RecordId) -> Option<&T> {
        self.items.get(id)
    }

    /// Appends an item, evicting and returning the oldest one if the ring is full.
    fn push(&mut self, id: RecordId, item: T) -> Option<T> {
        if self.capacity == 0 {
            return None;
        }
        let evicted = if self.order.len() == self.capacity {
            self.order
                .pop_front()
                .and_then(|oldest| self.items.remove(&oldest))
        } else {
            None
        };
        self.order.push_back(id);
        self.items.insert(id, item);
        evicted
    }

    /// Items from newest to oldest.
    fn newest_first(&self) -> impl Iterator<Item = &T> {
        self.order.iter().rev().filter_map(|id| self.items.get(id))
    }
}

/// A [`RequestLog`] backed by a shared [`MemoryStore`].
///
/// Records are deep-copied on the way in and on the way out, so nothing a caller
/// does to a value it holds can change what the store returns later.
///
/// ```no_run
/// use std::sync::Arc;
/// use request_log::{MemoryRequestLog, MemoryStore, RequestContext, RequestLog};
///
/// # async fn example() -> request_log::Result<()> {
/// let store = Arc::new(MemoryStore::new(50)?);
/// let log = MemoryRequestLog::new(store).with_application_name("/shop")?;
///
/// let request = log.create_request(&RequestContext::new()).await?;
/// let id = log.log_request(&request).await?;
/// assert!(log.get_request(&id.to_string()).await?.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryRequestLog {
    store: Arc<MemoryStore>,
    application_name: ApplicationName,
    lock_timeout: Option<Duration>,
}

impl MemoryRequestLog {
    /// Creates a log over a shared store.
    ///
    /// The application name is left uninitialized; set it with
    /// [`MemoryRequestLog::with_application_name`] or let the selector infer it.
    /// Lock waits are unbounded until [`MemoryRequestLog::with_lock_timeout`] is used.
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            application_name: ApplicationName::new(),
            lock_timeout: None,
        }
    }

    /// Scopes the log to `name`.
    pub fn with_application_name(self, name: &str) -> Result<Self> {
        self.application_name.set(name)?;
        Ok(self)
    }

    /// Bounds every wait for the store lock. Without a deadline, callers wait
    /// indefinitely.
    pub fn with_lock_timeout(mut self, deadline: Duration) -> Self {
        self.lock_timeout = Some(deadline);
        self
    }

    /// The store this log reads and writes.
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    async fn read(&self) -> Result<RwLockReadGuard<'_, Entries>> {
        let lock = self.store.entries.read();
        match self.lock_timeout {
            Some(deadline) => timeout(deadline, lock)
                .await
                .map_err(|_| Error::LockTimeout(deadline)),
            None => Ok(lock.await),
        }
    }

    async fn write(&self) -> Result<RwLockWriteGuard<'_, Entries>> {
        let lock = self.store.entries.write();
        match self.lock_timeout {
            Some(deadline) => timeout(deadline, lock)
                .await
                .map_err(|_| Error::LockTimeout(deadline)),
            None => Ok(lock.await),
        }
    }

    fn in_scope(&self, application_name: &str) -> bool {
        application_name == self.application_name.get()
    }
}

#[async_trait]
impl RequestLog for MemoryRequestLog {
    fn name(&self) -> &str {
        "In-Memory Request Log"
    }

    fn application_name(&self) -> &str {
        self.application_name.get()
    }

    fn set_application_name(&self, name: &str) -> Result<()> {
        self.application_name.set(name)
    }

    async fn log_session(&self, session: &Session) -> Result<RecordId> {
        let mut session = session.clone();
        session.application_name = self.application_name().to_string();

        let mut entries = self.write().await?;

        if let Some(existing) = entries
            .sessions
            .find(&session.application_name, &session.external_session_token)
        {
            debug!(session_id = %existing, "session already logged for token");
            return Ok(existing);
        }

        // Session ID collision mitigation
        while entries.sessions.contains(&session.id) {
            session.id = RecordId::new();
        }

        let id = session.id;
        entries.sessions.insert(session);
        debug!(session_id = %id, application = %self.application_name(), "logged session");
        Ok(id)
    }

    async fn log_request(&self, request: &ResourceRequest) -> Result<RecordId> {
        let mut request = request.clone();
        request.application_name = self.application_name().to_string();

        let mut entries = self.write().await?;

        // Request ID collision mitigation
        while entries.requests.contains(&request.id) {
            request.id = RecordId::new();
        }

        let id = request.id;
        entries.insert_request(request);
        debug!(request_id = %id, application = %self.application_name(), "logged request");
        Ok(id)
    }

    async fn find_session(&self, external_token: &str) -> Result<Option<RecordId>> {
        let entries = self.read().await?;
        Ok(entries.sessions.find(self.application_name(), external_token))
    }

    async fn get_request(&self, id: &str) -> Result<Option<ResourceRequest>> {
        let id = RecordId::parse(id)?;
        let entries = self.read().await?;
        Ok(entries
            .requests
            .get(&id)
            .filter(|request| self.in_scope(&request.application_name))
            .cloned())
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>> {
        let id = RecordId::parse(id)?;
        let entries = self.read().await?;
        Ok(entries
            .sessions
            .get(&id)
            .filter(|session| self.in_scope(&session.application_name))
            .cloned())
    }

    async fn get_requests(
        &self,
        page_index: i64,
        page_size: i64,
        out: &mut Vec<ResourceRequest>,
    ) -> Result<u64> {
        let (offset, limit) = page_bounds(page_index, page_size)?;

        let entries = self.read().await?;
        let in_scope: Vec<&ResourceRequest> = entries
            .requests
            .newest_first()
            .filter(|request| self.in_scope(&request.application_name))
            .collect();
        let total = in_scope.len() as u64;
        let page: Vec<ResourceRequest> = in_scope
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        drop(entries);

        out.extend(page);
        Ok(total)
    }

    async fn series_browsers_by_request(&self) -> Result<Vec<BrowserUsage>> {
        let entries = self.read().await?;
        let pairs: Vec<(String, i32)> = entries
            .requests
            .newest_first()
            .filter(|request| self.in_scope(&request.application_name))
            .filter_map(|request| request.session_id)
            .filter_map(|session_id| entries.sessions.get(&session_id))
            .map(|session| (session.browser.clone(), session.major_version))
            .collect();
        drop(entries);
        Ok(browsers::tally(pairs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;

    fn log_with(store: &Arc<MemoryStore>, app: &str) -> MemoryRequestLog {
        MemoryRequestLog::new(Arc::clone(store))
            .with_application_name(app)
            .unwrap()
    }

    async fn log_requests(log: &MemoryRequestLog, n: usize) -> Vec<RecordId> {
        let mut ids = Vec::new();
        for i in 0..n {
            let mut ctx = RequestContext::new();
            ctx.request.url = format!("/page/{i}");
            let request = log.create_request(&ctx).await.unwrap();
            ids.push(log.log_request(&request).await.unwrap());
        }
        ids
    }

    async fn page(log: &MemoryRequestLog, index: i64, size: i64) -> (u64, Vec<ResourceRequest>) {
        let mut out = Vec::new();
        let total = log.get_requests(index, size, &mut out).await.unwrap();
        (total, out)
    }

    #[test]
    fn capacity_bounds() {
        assert!(MemoryStore::new(500).is_ok());
        assert!(matches!(
            MemoryStore::new(501),
            Err(Error::InvalidArgument { name: "size", .. })
        ));
        assert_eq!(MemoryStore::clamped(-4).capacity(), 0);
        assert_eq!(MemoryStore::clamped(9000).capacity(), 500);
        assert_eq!(MemoryStore::default().capacity(), 15);
    }

    #[tokio::test]
    async fn oldest_requests_are_evicted_first() {
        let store = Arc::new(MemoryStore::new(3).unwrap());
        let log = log_with(&store, "app");
        let ids = log_requests(&log, 7).await;

        let (total, requests) = page(&log, 0, 10).await;
        assert_eq!(total, 3);
        let kept: Vec<_> = requests.iter().map(|r| r.id).collect();
        assert_eq!(kept, vec![ids[6], ids[5], ids[4]]);

        for evicted in &ids[..4] {
            assert!(log.get_request(&evicted.to_string()).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn capacity_two_scenario() {
        let store = Arc::new(MemoryStore::new(2).unwrap());
        let log = log_with(&store, "app");
        let ids = log_requests(&log, 3).await;

        let (total, requests) = page(&log, 0, 10).await;
        assert_eq!(total, 2);
        assert_eq!(
            requests.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![ids[2], ids[1]]
        );
        assert!(log.get_request(&ids[0].to_string()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pages_are_newest_first_with_true_total() {
        let store = Arc::new(MemoryStore::new(20).unwrap());
        let log = log_with(&store, "app");
        let ids = log_requests(&log, 7).await;

        let (total, first) = page(&log, 0, 3).await;
        assert_eq!(total, 7);
        assert_eq!(
            first.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![ids[6], ids[5], ids[4]]
        );

        let (_, last) = page(&log, 2, 3).await;
        assert_eq!(last.iter().map(|r| r.id).collect::<Vec<_>>(), vec![ids[0]]);

        let (total, beyond) = page(&log, 5, 3).await;
        assert_eq!(total, 7);
        assert!(beyond.is_empty());

        let (total, empty) = page(&log, 0, 0).await;
        assert_eq!(total, 7);
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn negative_paging_arguments_are_rejected() {
        let log = MemoryRequestLog::new(Arc::new(MemoryStore::default()));
        let mut out = Vec::new();
        assert!(matches!(
            log.get_requests(-1, 10, &mut out).await,
            Err(Error::OutOfRange { name: "page_index", .. })
        ));
        assert!(matches!(
            log.get_requests(0, -1, &mut out).await,
            Err(Error::OutOfRange { name: "page_size", .. })
        ));
    }

    #[tokio::test]
    async fn malformed_ids_are_invalid_arguments() {
        let log = MemoryRequestLog::new(Arc::new(MemoryStore::default()));
        assert!(matches!(
            log.get_request("").await,
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            log.get_request("nope").await,
            Err(Error::InvalidArgument { .. })
        ));
        assert!(log
            .get_request(&RecordId::new().to_string())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn returned_records_are_copies() {
        let store = Arc::new(MemoryStore::default());
        let log = log_with(&store, "app");

        let mut ctx = RequestContext::new();
        ctx.request.query_string.push("q", "rust");
        let mut request = log.create_request(&ctx).await.unwrap();
        let id = log.log_request(&request).await.unwrap();

        // mutate the value that was logged
        request.url = "/changed".into();
        request.query_string.push("extra", "1");

        let mut fetched = log.get_request(&id.to_string()).await.unwrap().unwrap();
        assert_eq!(fetched.url, "");
        assert_eq!(fetched.query_string.len(), 1);

        // mutate a fetched copy
        fetched.query_string.push("more", "2");
        fetched.user = Some("mallory".into());

        let again = log.get_request(&id.to_string()).await.unwrap().unwrap();
        assert_eq!(again.query_string.len(), 1);
        assert_eq!(again.user, None);
    }

    #[tokio::test]
    async fn logged_request_round_trips() {
        let store = Arc::new(MemoryStore::default());
        let log = log_with(&store, "app");

        let mut ctx = RequestContext::new();
        ctx.user = Some("alice".into());
        ctx.request.http_method = "POST".into();
        ctx.request.form.push("name", "value");
        ctx.request.accept_types = vec!["text/html".into()];
        ctx.response.status = "200 OK".into();
        let request = log.create_request(&ctx).await.unwrap();
        let id = log.log_request(&request).await.unwrap();

        let fetched = log.get_request(&id.to_string()).await.unwrap().unwrap();
        assert_eq!(fetched, request);
    }

    #[tokio::test]
    async fn duplicate_ids_are_replaced() {
        let store = Arc::new(MemoryStore::default());
        let log = log_with(&store, "app");
        let request = log.create_request(&RequestContext::new()).await.unwrap();

        let first = log.log_request(&request).await.unwrap();
        let second = log.log_request(&request).await.unwrap();
        assert_eq!(first, request.id);
        assert_ne!(first, second);
        assert_eq!(page(&log, 0, 10).await.0, 2);
    }

    #[tokio::test]
    async fn requests_with_one_token_share_one_session() {
        let store = Arc::new(MemoryStore::default());
        let log = log_with(&store, "app");
        let mut ctx = RequestContext::new();
        ctx.session_token = Some("abc".into());

        assert!(log.is_new_session("abc").await.unwrap());
        let mut session_ids = Vec::new();
        for _ in 0..3 {
            let request = log.create_request(&ctx).await.unwrap();
            log.log_request(&request).await.unwrap();
            session_ids.push(request.session_id.unwrap());
        }
        assert!(!log.is_new_session("abc").await.unwrap());
        assert!(session_ids.iter().all(|id| *id == session_ids[0]));

        let session = log
            .get_session(&session_ids[0].to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.external_session_token, "abc");
    }

    #[tokio::test]
    async fn logging_a_known_token_returns_the_existing_session() {
        let store = Arc::new(MemoryStore::default());
        let log = log_with(&store, "app");
        let mut ctx = RequestContext::new();
        ctx.session_token = Some("abc".into());

        let first = log.log_session(&log.create_session(&ctx)).await.unwrap();
        let second = log.log_session(&log.create_session(&ctx)).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn requests_without_token_have_no_session() {
        let log = log_with(&Arc::new(MemoryStore::default()), "app");
        let request = log.create_request(&RequestContext::new()).await.unwrap();
        assert_eq!(request.session_id, None);
    }

    #[tokio::test]
    async fn instances_share_the_store_but_not_the_scope() {
        let store = Arc::new(MemoryStore::default());
        let app_a = log_with(&store, "AppA");
        let app_b = log_with(&store, "AppB");

        let a = log_requests(&app_a, 1).await[0];
        let b = log_requests(&app_b, 1).await[0];

        let (total, requests) = page(&app_a, 0, 10).await;
        assert_eq!(total, 1);
        assert_eq!(requests[0].id, a);
        assert!(app_a.get_request(&b.to_string()).await.unwrap().is_none());

        // a second instance for the same application sees the same records
        let app_a_again = log_with(&store, "AppA");
        assert!(app_a_again.get_request(&a.to_string()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn application_name_is_assigned_by_the_log() {
        let log = log_with(&Arc::new(MemoryStore::default()), "app");
        let mut request = log.create_request(&RequestContext::new()).await.unwrap();
        request.application_name = "spoofed".into();
        let id = log.log_request(&request).await.unwrap();

        let fetched = log.get_request(&id.to_string()).await.unwrap().unwrap();
        assert_eq!(fetched.application_name, "app");
        assert!(matches!(
            log.set_application_name("again"),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn zero_capacity_stores_nothing() {
        let store = Arc::new(MemoryStore::new(0).unwrap());
        let log = log_with(&store, "app");
        let ids = log_requests(&log, 2).await;

        assert_eq!(page(&log, 0, 10).await.0, 0);
        assert!(log.get_request(&ids[0].to_string()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn browsers_by_request() {
        let store = Arc::new(MemoryStore::default());
        let log = log_with(&store, "app");

        for (token, browser, version, requests) in
            [("s1", "IE", 6, 3), ("s2", "Firefox", 3, 1), ("s3", "IE", 7, 2)]
        {
            let mut ctx = RequestContext::new();
            ctx.session_token = Some(token.into());
            ctx.browser.browser = browser.into();
            ctx.browser.major_version = version;
            for _ in 0..requests {
                let request = log.create_request(&ctx).await.unwrap();
                log.log_request(&request).await.unwrap();
            }
        }
        // requests without a session are not attributed to any browser
        log_requests(&log, 1).await;

        let series = log.series_browsers_by_request().await.unwrap();
        let labels: Vec<_> = series.iter().map(|u| (u.label(), u.count)).collect();
        assert_eq!(
            labels,
            vec![
                ("IE, version 6".to_string(), 3),
                ("IE, version 7".to_string(), 2),
                ("Firefox, version 3".to_string(), 1),
            ]
        );
    }

    #[tokio::test]
    async fn referenced_sessions_outlive_newer_sessions() {
        let store = Arc::new(MemoryStore::new(2).unwrap());
        let log = log_with(&store, "app");

        let mut ctx = RequestContext::new();
        ctx.session_token = Some("a".into());
        ctx.browser.browser = "IE".into();
        ctx.browser.major_version = 6;
        let first = log.create_request(&ctx).await.unwrap();
        log.log_request(&first).await.unwrap();

        for token in ["b", "c"] {
            let mut other = RequestContext::new();
            other.session_token = Some(token.into());
            log.log_session(&log.create_session(&other)).await.unwrap();
        }

        let second = log.create_request(&ctx).await.unwrap();
        log.log_request(&second).await.unwrap();

        assert!(first.session_id.is_some());
        assert_eq!(first.session_id, second.session_id);
        assert_eq!(log.find_session("a").await.unwrap(), first.session_id);

        let series = log.series_browsers_by_request().await.unwrap();
        let labels: Vec<_> = series.iter().map(|u| (u.label(), u.count)).collect();
        assert_eq!(labels, vec![("IE, version 6".to_string(), 2)]);
    }

    #[tokio::test]
    async fn session_is_dropped_with_its_last_request() {
        let store = Arc::new(MemoryStore::new(2).unwrap());
        let log = log_with(&store, "app");

        let mut ctx = RequestContext::new();
        ctx.session_token = Some("a".into());
        let request = log.create_request(&ctx).await.unwrap();
        log.log_request(&request).await.unwrap();
        let session_id = request.session_id.unwrap();

        log_requests(&log, 1).await;
        assert!(!log.is_new_session("a").await.unwrap());

        log_requests(&log, 1).await;
        assert!(log.is_new_session("a").await.unwrap());
        assert!(log
            .get_session(&session_id.to_string())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn lock_deadline_is_enforced() {
        let store = Arc::new(MemoryStore::default());
        let log = log_with(&store, "app").with_lock_timeout(Duration::from_millis(20));

        let guard = store.entries.write().await;
        assert!(matches!(
            log.get_request(&RecordId::new().to_string()).await,
            Err(Error::LockTimeout(_))
        ));
        let request = log.create_request(&RequestContext::new()).await;
        assert!(request.is_ok());
        drop(guard);

        let request = request.unwrap();
        assert!(log.log_request(&request).await.is_ok());
    }

    #[tokio::test]
    async fn concurrent_writers_respect_capacity() {
        let store = Arc::new(MemoryStore::new(10).unwrap());
        let log = Arc::new(log_with(&store, "app"));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let log = Arc::clone(&log);
            handles.push(tokio::spawn(async move { log_requests(&log, 5).await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let (total, requests) = page(&log, 0, 100).await;
        assert_eq!(total, 10);
        assert_eq!(requests.len(), 10);
    }
}
