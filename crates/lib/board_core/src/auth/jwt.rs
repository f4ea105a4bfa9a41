//! JWT token generation and verification.
//!
//! Tokens are signed with HS512 and carry the user id, the admin flag, an
//! absolute expiry and a refresh deadline ten minutes past it. Nothing is
//! stored server-side.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AuthError;

/// Token lifetime: one day.
const TOKEN_EXPIRY_SECS: i64 = 24 * 60 * 60;
/// Grace period after expiry during which a token may be refreshed.
const REFRESH_WINDOW_SECS: i64 = 10 * 60;

const INVALID_TOKEN: &str = "Invalid token.";

/// Claims embedded in every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub uid: i64,
    pub is_admin: bool,
    pub exp: i64,
    pub refresh_exp: i64,
}

/// Issue a token for `uid` valid from now.
pub fn issue_token(uid: i64, is_admin: bool, secret: &str) -> Result<String, AuthError> {
    issue_token_at(Utc::now(), uid, is_admin, secret)
}

/// Issue a token as if the current time were `now`.
pub fn issue_token_at(
    now: DateTime<Utc>,
    uid: i64,
    is_admin: bool,
    secret: &str,
) -> Result<String, AuthError> {
    let exp = now + Duration::seconds(TOKEN_EXPIRY_SECS);
    let claims = TokenClaims {
        uid,
        is_admin,
        exp: exp.timestamp(),
        refresh_exp: (exp + Duration::seconds(REFRESH_WINDOW_SECS)).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
}

/// Decode and check a token.
///
/// With `check_expiry` off, a token past `exp` is still accepted until its
/// refresh deadline. A token past `refresh_exp` is always rejected.
pub fn decode_token(token: &str, secret: &str, check_expiry: bool) -> Result<TokenClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS512);
    validation.leeway = 0;
    validation.validate_exp = check_expiry;
    validation.set_required_spec_claims(&["exp"]);

    let claims = decode::<TokenClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::InvalidToken("Signature has expired.".into()),
            _ => AuthError::InvalidToken(INVALID_TOKEN.into()),
        })?
        .claims;

    if claims.refresh_exp < Utc::now().timestamp() {
        return Err(AuthError::InvalidToken(INVALID_TOKEN.into()));
    }
    Ok(claims)
}

/// Resolve the JWT secret: env var `JWT_SECRET` → `AUTH_SECRET` → persisted file.
pub fn resolve_jwt_secret() -> String {
    if let Ok(secret) = std::env::var("JWT_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    if let Ok(secret) = std::env::var("AUTH_SECRET")
        && !secret.is_empty()
    {
        return secret;
    }
    let secret_path = jwt_secret_path();
    if let Ok(existing) = std::fs::read_to_string(&secret_path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = secret_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = std::fs::write(&secret_path, &secret);
    info!(path = %secret_path.display(), "generated new JWT secret");
    secret
}

fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("redis-board")
        .join("jwt-secret")
}
