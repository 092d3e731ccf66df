//! The logged session record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::id::{now_utc, RecordId};

/// One logical client visit, correlated across requests by its external token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: RecordId,
    pub application_name: String,
    pub host: String,
    pub user: Option<String>,
    /// The host framework's session identifier, or a locally minted one.
    pub external_session_token: String,
    pub begin_time_utc: DateTime<Utc>,
    pub browser: String,
    pub major_version: i32,
    /// Remaining client capabilities, kept as opaque attributes.
    pub capabilities: BTreeMap<String, String>,
}

impl Session {
    /// Captures a session for the client described by `ctx`.
    pub fn from_context(ctx: &RequestContext, application_name: &str) -> Self {
        let external_session_token = ctx
            .session_token()
            .map(str::to_string)
            .unwrap_or_else(|| RecordId::new().to_string());

        Self {
            id: RecordId::new(),
            application_name: application_name.to_string(),
            host: ctx.host.clone(),
            user: ctx.user.clone(),
            external_session_token,
            begin_time_utc: now_utc(),
            browser: ctx.browser.browser.clone(),
            major_version: ctx.browser.major_version,
            capabilities: ctx.browser.attributes.clone(),
        }
    }
}
