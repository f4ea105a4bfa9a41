//! User accounts.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{Result, StoreError, begin_write, classify};
use crate::auth::password::hash_password;
use crate::models::user::{NewUser, UserRow};
use crate::validation::ValidationError;

const DUPLICATE: &str = "User already exists.";
const UNIQUE_FIELDS: &[&str] = &["name", "email", "wx_id"];

/// Fetch a user by id.
pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<UserRow>> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Look a user up by name or email.
pub async fn find_by_identifier(pool: &SqlitePool, identifier: &str) -> Result<Option<UserRow>> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT * FROM users WHERE name = ? OR email = ? ORDER BY id LIMIT 1",
    )
    .bind(identifier)
    .bind(identifier)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Look a user up by linked messaging account.
pub async fn find_by_wx_id(pool: &SqlitePool, wx_id: &str) -> Result<Option<UserRow>> {
    let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE wx_id = ?")
        .bind(wx_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// All users in insertion order.
pub async fn list_all(pool: &SqlitePool) -> Result<Vec<UserRow>> {
    let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(n)
}

async fn check_unique(
    conn: &mut SqliteConnection,
    name: &str,
    email: &str,
    exclude_id: Option<i64>,
) -> Result<()> {
    let lookups = [
        ("name", "SELECT id FROM users WHERE name = ?", name),
        ("email", "SELECT id FROM users WHERE email = ?", email),
    ];
    for (field, sql, value) in lookups {
        let existing = sqlx::query_scalar::<_, i64>(sql)
            .bind(value)
            .fetch_optional(&mut *conn)
            .await?;
        if let Some(id) = existing
            && Some(id) != exclude_id
        {
            return Err(StoreError::Duplicate {
                field,
                message: DUPLICATE,
            });
        }
    }
    Ok(())
}

fn hash(password: &str) -> Result<String> {
    hash_password(password).map_err(|e| StoreError::Hash(e.to_string()))
}

/// Insert a new user. The password is required and stored as a bcrypt hash.
pub async fn create(pool: &SqlitePool, new: &NewUser) -> Result<UserRow> {
    let Some(password) = new.password.as_deref() else {
        return Err(ValidationError::new("password", "Missing data for required field.").into());
    };
    let password_hash = hash(password)?;
    let now = Utc::now();

    let mut tx = begin_write(pool).await?;
    check_unique(&mut tx, &new.name, &new.email, None).await?;
    let row = sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (name, email, password_hash, is_admin, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(&new.name)
    .bind(&new.email)
    .bind(password_hash)
    .bind(new.is_admin)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| classify(e, "users", UNIQUE_FIELDS, DUPLICATE))?;
    tx.commit().await?;

    info!(id = row.id, name = %row.name, is_admin = row.is_admin, "user created");
    Ok(row)
}

/// Replace `current` with the merged, validated `new` values. The hash is
/// only replaced when `new` carries a password.
pub async fn update(pool: &SqlitePool, current: &UserRow, new: &NewUser) -> Result<UserRow> {
    let password_hash = match new.password.as_deref() {
        Some(password) => hash(password)?,
        None => current.password_hash.clone(),
    };

    let mut tx = begin_write(pool).await?;
    check_unique(&mut tx, &new.name, &new.email, Some(current.id)).await?;
    let row = sqlx::query_as::<_, UserRow>(
        "UPDATE users SET name = ?, email = ?, password_hash = ?, is_admin = ?, updated_at = ? \
         WHERE id = ? RETURNING *",
    )
    .bind(&new.name)
    .bind(&new.email)
    .bind(password_hash)
    .bind(new.is_admin)
    .bind(Utc::now())
    .bind(current.id)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| classify(e, "users", UNIQUE_FIELDS, DUPLICATE))?;
    tx.commit().await?;

    debug!(id = row.id, "user updated");
    Ok(row)
}

/// Delete a user. Returns whether a row was removed.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    let deleted = result.rows_affected() > 0;
    if deleted {
        info!(id, "user deleted");
    }
    Ok(deleted)
}

/// Record a successful login.
pub async fn stamp_login(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("UPDATE users SET login_time = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Link a messaging account to a user.
pub async fn bind_wx_id(pool: &SqlitePool, id: i64, wx_id: &str) -> Result<UserRow> {
    let row = sqlx::query_as::<_, UserRow>(
        "UPDATE users SET wx_id = ?, updated_at = ? WHERE id = ? RETURNING *",
    )
    .bind(wx_id)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(|e| classify(e, "users", &["wx_id"], DUPLICATE))?;

    info!(id, "messaging account linked");
    Ok(row)
}

/// Create an administrator when the table is empty.
///
/// Returns the new row, or `None` if any user already exists.
pub async fn ensure_default_admin(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    password: &str,
) -> Result<Option<UserRow>> {
    if count(pool).await? > 0 {
        return Ok(None);
    }
    let admin = NewUser {
        name: name.to_string(),
        email: email.to_string(),
        password: Some(password.to_string()),
        is_admin: true,
    };
    create(pool, &admin).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_password;
    use crate::db;
    use crate::models::user::{USER_CREATE_RULES, USER_UPDATE_RULES, UserInput, UserView};
    use crate::store::testing::file_pool;

    fn new_user(name: &str, email: &str) -> NewUser {
        UserInput {
            name: Some(name.into()),
            email: Some(email.into()),
            password: Some("123456".into()),
            is_admin: None,
        }
        .into_new(USER_CREATE_RULES)
        .unwrap()
    }

    #[tokio::test]
    async fn create_hashes_password() {
        let pool = db::memory().await.unwrap();
        let row = create(&pool, &new_user("ops", "ops@example.com")).await.unwrap();
        assert_ne!("123456", row.password_hash);
        assert!(verify_password("123456", &row.password_hash).unwrap());

        let view = UserView::from(&get_by_id(&pool, row.id).await.unwrap().unwrap());
        assert_eq!("ops", view.name);
        assert_eq!("ops@example.com", view.email);
        assert!(!view.is_admin);
    }

    #[tokio::test]
    async fn duplicate_name_or_email_is_rejected() {
        let pool = db::memory().await.unwrap();
        create(&pool, &new_user("ops", "ops@example.com")).await.unwrap();

        let err = create(&pool, &new_user("ops", "other@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "name", .. }));

        let err = create(&pool, &new_user("other", "ops@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "email", .. }));
        assert_eq!(1, count(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn find_by_name_or_email() {
        let pool = db::memory().await.unwrap();
        let row = create(&pool, &new_user("ops", "ops@example.com")).await.unwrap();
        assert_eq!(row.id, find_by_identifier(&pool, "ops").await.unwrap().unwrap().id);
        assert_eq!(
            row.id,
            find_by_identifier(&pool, "ops@example.com").await.unwrap().unwrap().id
        );
        assert!(find_by_identifier(&pool, "nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_without_password_keeps_hash() {
        let pool = db::memory().await.unwrap();
        let row = create(&pool, &new_user("ops", "ops@example.com")).await.unwrap();

        let patch = UserInput {
            name: Some("new_name".into()),
            ..Default::default()
        };
        let new = patch.merge(&row).into_new(USER_UPDATE_RULES).unwrap();
        let updated = update(&pool, &row, &new).await.unwrap();
        assert_eq!("new_name", updated.name);
        assert_eq!(row.password_hash, updated.password_hash);

        let patch = UserInput {
            password: Some("changed".into()),
            ..Default::default()
        };
        let new = patch.merge(&updated).into_new(USER_UPDATE_RULES).unwrap();
        let changed = update(&pool, &updated, &new).await.unwrap();
        assert!(verify_password("changed", &changed.password_hash).unwrap());
    }

    #[tokio::test]
    async fn bind_and_lookup_wx_id() {
        let pool = db::memory().await.unwrap();
        let a = create(&pool, &new_user("a-user", "a@example.com")).await.unwrap();
        let b = create(&pool, &new_user("b-user", "b@example.com")).await.unwrap();

        bind_wx_id(&pool, a.id, "oWx1").await.unwrap();
        assert_eq!(a.id, find_by_wx_id(&pool, "oWx1").await.unwrap().unwrap().id);

        let err = bind_wx_id(&pool, b.id, "oWx1").await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { field: "wx_id", .. }));
    }

    #[tokio::test]
    async fn stamp_login_sets_time() {
        let pool = db::memory().await.unwrap();
        let row = create(&pool, &new_user("ops", "ops@example.com")).await.unwrap();
        assert!(row.login_time.is_none());
        stamp_login(&pool, row.id).await.unwrap();
        assert!(get_by_id(&pool, row.id).await.unwrap().unwrap().login_time.is_some());
    }

    #[tokio::test]
    async fn default_admin_only_seeded_once() {
        let pool = db::memory().await.unwrap();
        let admin = ensure_default_admin(&pool, "admin", "admin@example.com", "123456")
            .await
            .unwrap()
            .unwrap();
        assert!(admin.is_admin);

        let again = ensure_default_admin(&pool, "admin", "admin@example.com", "123456")
            .await
            .unwrap();
        assert!(again.is_none());
        assert_eq!(1, count(&pool).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicate_creates_admit_exactly_one() {
        let (_dir, pool) = file_pool(8).await;
        let attempts = (0..6).map(|i| {
            let pool = pool.clone();
            let user = new_user("race", &format!("race{i}@example.com"));
            tokio::spawn(async move { create(&pool, &user).await })
        });
        let results: Vec<_> = futures::future::join_all(attempts)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(1, results.iter().filter(|r| r.is_ok()).count());
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                matches!(err, StoreError::Duplicate { field: "name", .. }),
                "unexpected error: {err}"
            );
        }
        assert_eq!(1, count(&pool).await.unwrap());
        pool.close().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_distinct_creates_all_succeed() {
        let (_dir, pool) = file_pool(8).await;
        let attempts = (0..6).map(|i| {
            let pool = pool.clone();
            let user = new_user(&format!("ops-{i}"), &format!("ops{i}@example.com"));
            tokio::spawn(async move { create(&pool, &user).await })
        });
        for result in futures::future::join_all(attempts).await {
            result.unwrap().unwrap();
        }
        assert_eq!(6, count(&pool).await.unwrap());
        pool.close().await;
    }
}
