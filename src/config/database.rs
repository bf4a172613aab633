//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Creation is idempotent (`IF NOT EXISTS`)
//! because the worker creates tables on every start.

use crate::entities::{Commission, Seller, SystemState, WithdrawalRequest};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};

/// Default database location when neither `DATABASE_URL` nor config.toml names one.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/settlement.sqlite?mode=rwc";

/// Gets the database URL, preferring the `DATABASE_URL` environment variable
/// over the configured value.
#[must_use]
pub fn get_database_url(configured: &str) -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| configured.to_string())
}

/// Creates the parent directory of a file-backed `SQLite` URL so the database file
/// can be created on first start. In-memory and non-`SQLite` URLs are left alone.
pub fn ensure_sqlite_parent_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path.contains(":memory:") {
        return Ok(());
    }
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Establishes a connection to the database at `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    Database::connect(database_url).await.map_err(Into::into)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables that do not exist yet: commissions, sellers,
/// withdrawal requests, and system state.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Commission).await?;
    create_table(db, &schema, Seller).await?;
    create_table(db, &schema, WithdrawalRequest).await?;
    create_table(db, &schema, SystemState).await?;

    Ok(())
}
