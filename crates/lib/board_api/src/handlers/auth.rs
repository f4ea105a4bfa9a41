//! Login handler.

use axum::body::Bytes;
use axum::extract::State;

use crate::AppState;
use crate::error::AppResult;
use crate::rest::RestJson;
use crate::services::auth::{self, LoginResponse};

/// `POST /login`: exchange name (or email) and password for a token.
pub async fn login_handler(State(state): State<AppState>, body: Bytes) -> AppResult<RestJson<LoginResponse>> {
    let credentials = auth::parse_credentials(&body)?;
    let resp = auth::login(&state.pool, &credentials, &state.config.jwt_secret).await?;
    Ok(RestJson(resp))
}
