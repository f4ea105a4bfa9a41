//! Object-must-exist guards.
//!
//! Resolve the `{id}` path segment to a stored record before the handler
//! runs. Non-numeric and unknown ids are both 404.

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use board_core::models::server::ServerRow;
use board_core::models::user::UserRow;
use board_core::store;

use crate::AppState;
use crate::error::AppError;

/// A server loaded from the `{id}` path segment.
#[derive(Debug, Clone)]
pub struct ServerPath(pub ServerRow);

/// A user loaded from the `{id}` path segment.
#[derive(Debug, Clone)]
pub struct UserPath(pub UserRow);

async fn path_id(parts: &mut Parts, state: &AppState) -> Result<i64, AppError> {
    let Path(raw) = Path::<String>::from_request_parts(parts, state)
        .await
        .map_err(|_| AppError::NotFound)?;
    raw.parse().map_err(|_| AppError::NotFound)
}

impl FromRequestParts<AppState> for ServerPath {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let id = path_id(parts, state).await?;
        store::servers::get_by_id(&state.pool, id)
            .await?
            .map(ServerPath)
            .ok_or(AppError::NotFound)
    }
}

impl FromRequestParts<AppState> for UserPath {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let id = path_id(parts, state).await?;
        store::users::get_by_id(&state.pool, id)
            .await?
            .map(UserPath)
            .ok_or(AppError::NotFound)
    }
}
