//! Login flow delegating to `board_core::auth`.

use board_core::auth::{self, jwt};
use board_core::store;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::info;

use crate::error::{AppError, AppResult};

/// Name (or email) and password pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub name: String,
    pub password: String,
}

/// Body of a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub ok: bool,
    pub token: String,
}

const BODY_REQUIRED: &str = "User name or password is required.";
const FIELDS_REQUIRED: &str = "User name and password must not be empty.";

/// Pull credentials out of a raw request body.
///
/// Anything but a non-empty JSON object is an authentication error rather
/// than a validation error, so login failures all share one status.
pub fn parse_credentials(body: &[u8]) -> AppResult<Credentials> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| AppError::Authentication(BODY_REQUIRED.into()))?;
    let Some(object) = value.as_object().filter(|o| !o.is_empty()) else {
        return Err(AppError::Authentication(BODY_REQUIRED.into()));
    };
    let field = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    match (field("name"), field("password")) {
        (Some(name), Some(password)) => Ok(Credentials { name, password }),
        _ => Err(AppError::Authentication(FIELDS_REQUIRED.into())),
    }
}

/// Verify credentials, stamp the login time and issue a token.
pub async fn login(pool: &SqlitePool, credentials: &Credentials, secret: &str) -> AppResult<LoginResponse> {
    let user = auth::authenticate(pool, &credentials.name, &credentials.password).await?;
    store::users::stamp_login(pool, user.id).await?;
    let token = jwt::issue_token(user.id, user.is_admin, secret)?;
    info!(uid = user.id, "user logged in");
    Ok(LoginResponse { ok: true, token })
}
