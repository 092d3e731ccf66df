use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sessions::Id).text().not_null().primary_key())
                    .col(ColumnDef::new(Sessions::ApplicationName).string_len(256).not_null())
                    .col(ColumnDef::new(Sessions::Host).string().not_null())
                    .col(ColumnDef::new(Sessions::User).string().null())
                    .col(ColumnDef::new(Sessions::ExternalSessionToken).string().not_null())
                    .col(
                        ColumnDef::new(Sessions::BeginTimeUtc)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Sessions::Browser).string().not_null())
                    .col(ColumnDef::new(Sessions::MajorVersion).integer().not_null())
                    .col(ColumnDef::new(Sessions::Capabilities).blob().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_request_log_sessions_application_token")
                    .table(Sessions::Table)
                    .col(Sessions::ApplicationName)
                    .col(Sessions::ExternalSessionToken)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Requests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Requests::Seq)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Requests::Id).text().not_null().unique_key())
                    .col(ColumnDef::new(Requests::ApplicationName).string_len(256).not_null())
                    .col(ColumnDef::new(Requests::SessionId).text().null())
                    .col(ColumnDef::new(Requests::Host).string().not_null())
                    .col(ColumnDef::new(Requests::User).string().null())
                    .col(
                        ColumnDef::new(Requests::TimeUtc)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Requests::AcceptTypes).text().not_null())
                    .col(ColumnDef::new(Requests::ContentType).string().not_null())
                    .col(ColumnDef::new(Requests::ContentEncoding).string().not_null())
                    .col(ColumnDef::new(Requests::Cookies).text().not_null())
                    .col(ColumnDef::new(Requests::Form).text().not_null())
                    .col(ColumnDef::new(Requests::QueryString).text().not_null())
                    .col(ColumnDef::new(Requests::ServerVariables).text().not_null())
                    .col(ColumnDef::new(Requests::HttpMethod).string().not_null())
                    .col(ColumnDef::new(Requests::Url).text().not_null())
                    .col(ColumnDef::new(Requests::UserAgent).text().null())
                    .col(ColumnDef::new(Requests::UserHostAddress).string().null())
                    .col(ColumnDef::new(Requests::UserHostName).string().null())
                    .col(ColumnDef::new(Requests::TotalBytes).big_integer().not_null())
                    .col(ColumnDef::new(Requests::IsAuthenticated).boolean().not_null())
                    .col(ColumnDef::new(Requests::IsLocal).boolean().not_null())
                    .col(ColumnDef::new(Requests::IsSecureConnection).boolean().not_null())
                    .col(ColumnDef::new(Requests::ResponseContentType).string().not_null())
                    .col(
                        ColumnDef::new(Requests::ResponseContentEncoding)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Requests::ResponseCookies).text().not_null())
                    .col(ColumnDef::new(Requests::ResponseStatus).string().not_null())
                    .col(ColumnDef::new(Requests::HandlerType).string().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_request_log_requests_session")
                            .from(Requests::Table, Requests::SessionId)
                            .to(Sessions::Table, Sessions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_request_log_requests_application_time")
                    .table(Requests::Table)
                    .col(Requests::ApplicationName)
                    .col(Requests::TimeUtc)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Requests::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Sessions {
    #[sea_orm(iden = "request_log_sessions")]
    Table,
    Id,
    ApplicationName,
    Host,
    User,
    ExternalSessionToken,
    BeginTimeUtc,
    Browser,
    MajorVersion,
    Capabilities,
}

#[derive(DeriveIden)]
enum Requests {
    #[sea_orm(iden = "request_log_requests")]
    Table,
    Seq,
    Id,
    ApplicationName,
    SessionId,
    Host,
    User,
    TimeUtc,
    AcceptTypes,
    ContentType,
    ContentEncoding,
    Cookies,
    Form,
    QueryString,
    ServerVariables,
    HttpMethod,
    Url,
    UserAgent,
    UserHostAddress,
    UserHostName,
    TotalBytes,
    IsAuthenticated,
    IsLocal,
    IsSecureConnection,
    ResponseContentType,
    ResponseContentEncoding,
    ResponseCookies,
    ResponseStatus,
    HandlerType,
}
