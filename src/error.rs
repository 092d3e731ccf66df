//! Error types shared by every request log implementation.

use std::time::Duration;

/// Errors surfaced by request log operations.
///
/// Every failure is reported synchronously by the call that caused it. None of the
/// variants are retried inside this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An argument was empty, malformed or too long.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Name of the offending parameter.
        name: &'static str,
        /// Human readable description of the problem.
        reason: String,
    },

    /// A numeric argument was outside of its accepted range.
    #[error("argument `{name}` is out of range: {value}")]
    OutOfRange {
        /// Name of the offending parameter.
        name: &'static str,
        /// The rejected value.
        value: i64,
    },

    /// The operation is not valid for the current state of the log.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The memory store lock could not be acquired before the configured deadline.
    #[error("timed out after {0:?} waiting for the memory store lock")]
    LockTimeout(Duration),

    /// The backing database failed to connect, insert or query.
    #[error("backend error: {0}")]
    Backend(String),

    /// A value could not be encoded for storage.
    #[error("encode error: {0}")]
    Encode(String),

    /// A stored value could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The store selection configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
