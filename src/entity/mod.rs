//! Database entity models for the relational request log.
//!
//! This module contains the Sea-ORM entity definitions used by
//! [`SqlRequestLog`](crate::SqlRequestLog). Two related tables make up the schema:
//! sessions, and the requests that reference them.

/// Session entity model: one row per logged client session.
pub mod session;

/// Request entity model: one row per logged HTTP request.
pub mod request;
