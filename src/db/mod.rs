use sqlx::migrate::Migrator;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::str::FromStr;
use thiserror::Error;

pub mod models;

/// Embedded migrations from the `migrations/` directory.
pub static MIGRATOR: Migrator = sqlx::migrate!();

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Failed to parse database URL: {0}")]
    UrlParse(String),
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Failed to run migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Opens the SQLite database, creating the file if missing, and brings the
/// schema up to date.
///
/// Foreign keys are enabled explicitly: supplier/customer deletion nulls the
/// references on dependents, medicine deletion cascades to its purchase and
/// sale history.
pub async fn init_db(database_url: &str) -> Result<SqlitePool, DatabaseError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| DatabaseError::UrlParse(e.to_string()))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(options).await?;
    MIGRATOR.run(&pool).await?;

    Ok(pool)
}
