//! SQLite connection pool management.
//!
//! The board keeps its records in a single SQLite database. Production runs
//! point at a file (`sqlite://board.db?mode=rwc`); tests use a private
//! in-memory database that lives as long as its pool.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::info;

/// Default database URL (file next to the working directory).
pub const DEFAULT_DATABASE_URL: &str = "sqlite://board.db?mode=rwc";

/// Maximum time to wait for a pooled connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur while opening the database.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, DbError>;

/// Open a connection pool for `database_url`.
///
/// File databases use WAL journaling so readers do not block the writer.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect_with(options)
        .await?;

    info!(url = database_url, max_connections, "database pool ready");
    Ok(pool)
}

/// Open a private in-memory database with the schema applied.
///
/// The pool is pinned to one connection that never expires; every new
/// in-memory connection would otherwise see an empty database.
pub async fn memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    crate::migrate::migrate(&pool).await?;
    Ok(pool)
}
