//! Persistence for servers and users.
//!
//! Every write runs its uniqueness check and the statement itself in one
//! `BEGIN IMMEDIATE` transaction, so concurrent writers queue on the
//! database's busy timeout instead of failing to upgrade a read lock. The
//! schema's `UNIQUE` constraints back that up, and a constraint violation
//! surfaces as [`StoreError::Duplicate`] as well.

pub mod servers;
pub mod users;

use sqlx::{Sqlite, SqlitePool, Transaction};
use thiserror::Error;

use crate::secrets::SecretError;
use crate::validation::ValidationError;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{message}")]
    Duplicate {
        field: &'static str,
        message: &'static str,
    },

    #[error("Secret error: {0}")]
    Secret(#[from] SecretError),

    #[error("Password hash error: {0}")]
    Hash(String),

    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Start a transaction that holds the write lock from its first statement.
pub(crate) async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Map a unique-constraint violation onto one of `fields`.
///
/// SQLite reports the offending column as `table.column` in the message.
/// Other errors pass through unchanged.
pub(crate) fn classify(
    err: sqlx::Error,
    table: &str,
    fields: &[&'static str],
    message: &'static str,
) -> StoreError {
    let sqlx::Error::Database(db) = &err else {
        return StoreError::Db(err);
    };
    if !db.is_unique_violation() {
        return StoreError::Db(err);
    }
    let text = db.message();
    let field = fields
        .iter()
        .copied()
        .find(|field| text.contains(&format!("{table}.{field}")))
        .or_else(|| fields.first().copied())
        .unwrap_or("id");
    StoreError::Duplicate { field, message }
}
