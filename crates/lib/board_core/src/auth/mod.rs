//! Authentication: password checks and bearer tokens.
//!
//! Shared by the REST API and the messaging bind flow.

pub mod jwt;
pub mod password;

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::debug;

use crate::models::user::UserRow;
use crate::store::{self, StoreError};

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    InvalidToken(String),

    #[error("User not exists.")]
    UserNotFound,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Message for any credential mismatch. Does not reveal which part failed.
pub const AUTHENTICATE_FAILED: &str = "Authenticate failed.";

/// Verify `password` for the user named (or emailed) `identifier`.
pub async fn authenticate(
    pool: &SqlitePool,
    identifier: &str,
    password: &str,
) -> Result<UserRow, AuthError> {
    let Some(user) = store::users::find_by_identifier(pool, identifier).await? else {
        debug!(identifier, "login for unknown user");
        return Err(AuthError::Authentication(AUTHENTICATE_FAILED.into()));
    };
    if !password::verify_password(password, &user.password_hash)? {
        debug!(uid = user.id, "password mismatch");
        return Err(AuthError::Authentication(AUTHENTICATE_FAILED.into()));
    }
    Ok(user)
}

/// Resolve a token to the user it was issued for.
pub async fn authenticate_token(
    pool: &SqlitePool,
    token: &str,
    secret: &str,
    check_expiry: bool,
) -> Result<UserRow, AuthError> {
    let claims = jwt::decode_token(token, secret, check_expiry)?;
    store::users::get_by_id(pool, claims.uid)
        .await?
        .ok_or(AuthError::UserNotFound)
}

/// Exchange a token that is expired but inside its refresh window for a
/// fresh one.
pub async fn refresh_token(pool: &SqlitePool, token: &str, secret: &str) -> Result<String, AuthError> {
    let user = authenticate_token(pool, token, secret, false).await?;
    jwt::issue_token(user.id, user.is_admin, secret)
}
