//! Request entity model for Sea-ORM database interaction.
//!
//! Maps to the `request_log_requests` table. Collection-valued fields (cookies,
//! form values, query string, server variables) are stored in their encoded
//! `name=value;name=value` form.

use sea_orm::entity::prelude::*;

/// Sea-ORM entity model representing a logged HTTP request.
///
/// `seq` is a monotonic surrogate key. It breaks ties between rows logged within
/// the same timestamp so paging order is total. The public identifier is `id`.
///
/// Rows are read per application through an index on
/// `(application_name, time_utc)`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "request_log_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub seq: i32,

    /// The request identifier, a UUID stored as text.
    #[sea_orm(unique, column_type = "Text")]
    pub id: String,

    pub application_name: String,

    /// Owning session, if the request was correlated to one.
    pub session_id: Option<String>,

    pub host: String,
    pub user: Option<String>,
    pub time_utc: ChronoDateTimeUtc,

    #[sea_orm(column_type = "Text")]
    pub accept_types: String,
    pub content_type: String,
    pub content_encoding: String,
    #[sea_orm(column_type = "Text")]
    pub cookies: String,
    #[sea_orm(column_type = "Text")]
    pub form: String,
    #[sea_orm(column_type = "Text")]
    pub query_string: String,
    #[sea_orm(column_type = "Text")]
    pub server_variables: String,
    pub http_method: String,
    #[sea_orm(column_type = "Text")]
    pub url: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub user_agent: Option<String>,
    pub user_host_address: Option<String>,
    pub user_host_name: Option<String>,
    pub total_bytes: i64,
    pub is_authenticated: bool,
    pub is_local: bool,
    pub is_secure_connection: bool,

    pub response_content_type: String,
    pub response_content_encoding: String,
    #[sea_orm(column_type = "Text")]
    pub response_cookies: String,
    pub response_status: String,
    pub handler_type: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Belongs to a session (optional).
    #[sea_orm(
        belongs_to = "super::session::Entity",
        from = "Column::SessionId",
        to = "super::session::Column::Id"
    )]
    Session,
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
