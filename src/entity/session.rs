//! Session entity model for Sea-ORM database interaction.
//!
//! This module defines the database schema representation for logged sessions.
//! It maps to the `request_log_sessions` table.

use sea_orm::entity::prelude::*;

/// Sea-ORM entity model representing a logged session.
///
/// # Database Schema
///
/// | Column                 | Type               | Description                              |
/// |------------------------|--------------------|------------------------------------------|
/// | id                     | TEXT (Primary Key) | Session ID                               |
/// | application_name       | TEXT               | Application scope                        |
/// | host                   | TEXT               | Machine that recorded the session        |
/// | user                   | TEXT NULL          | Authenticated user, if any               |
/// | external_session_token | TEXT               | Host framework session identifier        |
/// | begin_time_utc         | TIMESTAMPTZ        | When the session was first seen          |
/// | browser                | TEXT               | Browser family                           |
/// | major_version          | INTEGER            | Browser major version                    |
/// | capabilities           | BYTEA              | MessagePack map of remaining capabilities|
///
/// `(application_name, external_session_token)` is unique.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "request_log_sessions")]
pub struct Model {
    /// The session identifier, a UUID stored as text.
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,

    pub application_name: String,

    pub host: String,

    pub user: Option<String>,

    /// The token the host framework uses for this session. Requests carrying the
    /// same token within one application are correlated to this row.
    pub external_session_token: String,

    pub begin_time_utc: ChronoDateTimeUtc,

    pub browser: String,

    pub major_version: i32,

    /// Opaque client capabilities, serialized with MessagePack.
    pub capabilities: Vec<u8>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A session has many requests.
    #[sea_orm(has_many = "super::request::Entity")]
    Request,
}

impl Related<super::request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Request.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
