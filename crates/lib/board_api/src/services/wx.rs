//! Linking a messaging account to a board user.

use board_core::auth;
use board_core::store;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::services::auth::Credentials;

pub const BOUND: &str = "Bound successfully.";
const USER_ALREADY_BOUND: &str = "This Redis Board user is already bound to a WeChat account.";
const WX_ALREADY_BOUND: &str = "This WeChat account is already bound to a Redis Board user.";

/// Authenticate `credentials` and link `wx_id` to that user.
///
/// Binding is one-way: a user that already has an account linked, or an
/// account that is already linked elsewhere, is rejected.
pub async fn bind(pool: &SqlitePool, wx_id: &str, credentials: &Credentials) -> AppResult<()> {
    let user = auth::authenticate(pool, &credentials.name, &credentials.password).await?;
    if user.wx_id.is_some() {
        return Err(AppError::Validation(USER_ALREADY_BOUND.into()));
    }
    if store::users::find_by_wx_id(pool, wx_id).await?.is_some() {
        return Err(AppError::Validation(WX_ALREADY_BOUND.into()));
    }
    store::users::bind_wx_id(pool, user.id, wx_id).await?;
    info!(uid = user.id, "messaging account bound");
    Ok(())
}
