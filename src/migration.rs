//! Schema migrations for the relational request log.
//!
//! Run [`Migrator`] once against a fresh database before handing its connection
//! to [`SqlRequestLog`](crate::SqlRequestLog).

pub use sea_orm_migration::prelude::*;

mod m20240101_000001_create_request_log_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    // Override the name of migration table to avoid conflicts
    fn migration_table_name() -> sea_orm::DynIden {
        Alias::new("request_log_migrations").into_iden()
    }

    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(
            m20240101_000001_create_request_log_tables::Migration,
        )]
    }
}
