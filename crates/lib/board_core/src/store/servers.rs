//! Redis server records.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{Result, StoreError, begin_write, classify};
use crate::models::server::{NewServer, ServerRow};
use crate::secrets;

const DUPLICATE: &str = "Redis server already exists.";

/// Fetch a server by id.
pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<ServerRow>> {
    let row = sqlx::query_as::<_, ServerRow>("SELECT * FROM redis_server WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Fetch a server by its unique name.
pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<ServerRow>> {
    let row = sqlx::query_as::<_, ServerRow>("SELECT * FROM redis_server WHERE name = ?")
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// All servers in insertion order.
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<ServerRow>> {
    let rows = sqlx::query_as::<_, ServerRow>("SELECT * FROM redis_server ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Number of registered servers.
pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM redis_server")
        .fetch_one(pool)
        .await?;
    Ok(n)
}

/// Fail with [`StoreError::Duplicate`] if another server already uses `name`.
///
/// `exclude_id` is the record being updated, if any.
pub async fn ensure_unique(pool: &SqlitePool, name: &str, exclude_id: Option<i64>) -> Result<()> {
    let mut conn = pool.acquire().await?;
    check_unique(&mut conn, name, exclude_id).await
}

async fn check_unique(conn: &mut SqliteConnection, name: &str, exclude_id: Option<i64>) -> Result<()> {
    let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM redis_server WHERE name = ?")
        .bind(name)
        .fetch_optional(conn)
        .await?;
    match existing {
        Some(id) if Some(id) != exclude_id => Err(StoreError::Duplicate {
            field: "name",
            message: DUPLICATE,
        }),
        _ => Ok(()),
    }
}

fn seal(password: Option<&str>, secret_key: &str) -> Result<Option<String>> {
    match password {
        Some(p) if !p.is_empty() => Ok(Some(secrets::seal(p, secret_key)?)),
        _ => Ok(None),
    }
}

/// Insert a new server.
pub async fn create(pool: &SqlitePool, new: &NewServer, secret_key: &str) -> Result<ServerRow> {
    let password = seal(new.password.as_deref(), secret_key)?;
    let now = Utc::now();

    let mut tx = begin_write(pool).await?;
    check_unique(&mut tx, &new.name, None).await?;
    let row = sqlx::query_as::<_, ServerRow>(
        "INSERT INTO redis_server (name, description, host, port, password, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(&new.name)
    .bind(&new.description)
    .bind(&new.host)
    .bind(i64::from(new.port))
    .bind(password)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| classify(e, "redis_server", &["name"], DUPLICATE))?;
    tx.commit().await?;

    info!(id = row.id, name = %row.name, "server created");
    Ok(row)
}

/// Replace `current` with the merged, validated `new` values.
///
/// A `None` password keeps the stored secret; `Some("")` clears it.
pub async fn update(
    pool: &SqlitePool,
    current: &ServerRow,
    new: &NewServer,
    secret_key: &str,
) -> Result<ServerRow> {
    let password = match new.password.as_deref() {
        None => current.password.clone(),
        Some(p) => seal(Some(p), secret_key)?,
    };

    let mut tx = begin_write(pool).await?;
    check_unique(&mut tx, &new.name, Some(current.id)).await?;
    let row = sqlx::query_as::<_, ServerRow>(
        "UPDATE redis_server SET name = ?, description = ?, host = ?, port = ?, password = ?, \
         updated_at = ? WHERE id = ? RETURNING *",
    )
    .bind(&new.name)
    .bind(&new.description)
    .bind(&new.host)
    .bind(i64::from(new.port))
    .bind(password)
    .bind(Utc::now())
    .bind(current.id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| classify(e, "redis_server", &["name"], DUPLICATE))?;
    tx.commit().await?;

    debug!(id = row.id, "server updated");
    Ok(row)
}

/// Delete a server. Returns whether a row was removed.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM redis_server WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    let deleted = result.rows_affected() > 0;
    if deleted {
        info!(id, "server deleted");
    }
    Ok(deleted)
}
