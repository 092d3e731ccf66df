//! Record identifiers and timestamps.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Opaque unique identifier of a logged request or session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Mints a new random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an identifier handed in by a caller.
    ///
    /// Empty and malformed values are rejected as invalid arguments, never as
    /// "not found".
    pub fn parse(id: &str) -> Result<Self> {
        if id.is_empty() {
            return Err(Error::invalid_argument("id", "must not be empty"));
        }
        Uuid::parse_str(id)
            .map(Self)
            .map_err(|e| Error::invalid_argument("id", e.to_string()))
    }

    /// Parses an identifier read back from storage.
    pub(crate) fn decode(id: &str) -> Result<Self> {
        Uuid::parse_str(id)
            .map(Self)
            .map_err(|e| Error::Decode(format!("stored id `{id}`: {e}")))
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Current UTC time, truncated to microseconds.
///
/// Postgres stores microsecond precision, so truncating up front keeps values
/// equal after a round trip through any backend.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
