//! Authentication middleware: `JWT` token extraction and verification.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use board_core::auth;
use board_core::models::user::UserRow;

use crate::AppState;
use crate::error::AppError;

/// The caller, inserted into request extensions by [`require_token`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub UserRow);

/// An authenticated caller with the admin flag set.
#[derive(Debug, Clone)]
pub struct AdminUser(pub UserRow);

/// Classify an `Authorization` header value and return the token.
///
/// The expected form is `JWT <token>`, scheme case-insensitive.
pub fn parse_authorization(header: Option<&str>) -> Result<&str, AppError> {
    let header = header.map(str::trim).unwrap_or_default();
    if header.is_empty() {
        return Err(AppError::TokenMissing("Token not found."));
    }
    let parts: Vec<&str> = header.split_whitespace().collect();
    if !parts[0].eq_ignore_ascii_case("jwt") {
        return Err(AppError::InvalidTokenHeader);
    }
    match parts.as_slice() {
        [_] => Err(AppError::TokenMissing("Token missing.")),
        [_, token] => Ok(*token),
        _ => Err(AppError::TooManyParts),
    }
}

/// Axum middleware: verifies `Authorization: JWT <token>`, loads the user,
/// and injects [`AuthenticatedUser`] into request extensions.
pub async fn require_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .map(|v| v.to_str().map_err(|_| AppError::InvalidTokenHeader))
        .transpose()?;
    let token = parse_authorization(header)?.to_string();

    let user = auth::authenticate_token(&state.pool, &token, &state.config.jwt_secret, true).await?;
    request.extensions_mut().insert(AuthenticatedUser(user));

    Ok(next.run(request).await)
}

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::TokenMissing("Token not found."))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user) = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(AppError::NoPermission);
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(header: Option<&str>) -> String {
        parse_authorization(header).unwrap_err().to_string()
    }

    #[test]
    fn accepts_jwt_scheme_any_case() {
        assert_eq!("abc", parse_authorization(Some("JWT abc")).unwrap());
        assert_eq!("abc", parse_authorization(Some("jwt  abc ")).unwrap());
    }

    #[test]
    fn classifies_bad_headers() {
        assert_eq!("Token not found.", message(None));
        assert_eq!("Token not found.", message(Some("   ")));
        assert_eq!("Invalid token header.", message(Some("Bearer abc")));
        assert_eq!("Token missing.", message(Some("JWT")));
        assert_eq!("Invalid token.", message(Some("JWT abc def")));
    }
}
