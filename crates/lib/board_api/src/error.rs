//! Application error types.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use board_core::auth::AuthError;
use board_core::probe::ProbeError;
use board_core::secrets::SecretError;
use board_core::store::StoreError;
use board_core::validation::ValidationError;
use board_core::wx::WxError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::rest;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
///
/// Every variant renders as `{"ok": false, "message": ...}`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("Object not exists.")]
    NotFound,

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    InvalidToken(String),

    #[error("User not exists.")]
    UserNotFound,

    /// Missing header or missing token after the scheme.
    #[error("{0}")]
    TokenMissing(&'static str),

    #[error("Invalid token header.")]
    InvalidTokenHeader,

    #[error("Invalid token.")]
    TooManyParts,

    #[error("No permission.")]
    NoPermission,

    #[error("You can not delete yourself.")]
    SelfDeletion,

    #[error("{0}")]
    ServerUnreachable(String),

    #[error("{0}")]
    MessagingBackend(String),

    #[error("Signature mismatch.")]
    SignatureMismatch,

    #[error("Internal server error")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::Duplicate(_)
            | AppError::SelfDeletion
            | AppError::ServerUnreachable(_)
            | AppError::MessagingBackend(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::TokenMissing(_) | AppError::InvalidTokenHeader | AppError::TooManyParts => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Authentication(_)
            | AppError::InvalidToken(_)
            | AppError::UserNotFound
            | AppError::NoPermission
            | AppError::SignatureMismatch => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(detail) = &self {
            error!(error = %detail, "internal error");
        }
        let body = json!({ "ok": false, "message": self.to_string() });
        rest::json_response(self.status(), &body)
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::Validation(e.message)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<SecretError> for AppError {
    fn from(e: SecretError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(e) => AppError::from(e),
            StoreError::Duplicate { message, .. } => AppError::Duplicate(message.to_string()),
            StoreError::Secret(e) => AppError::from(e),
            StoreError::Hash(msg) => AppError::Internal(msg),
            StoreError::Db(e) => AppError::from(e),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Authentication(msg) => AppError::Authentication(msg),
            AuthError::InvalidToken(msg) => AppError::InvalidToken(msg),
            AuthError::UserNotFound => AppError::UserNotFound,
            AuthError::Store(e) => AppError::from(e),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<ProbeError> for AppError {
    fn from(e: ProbeError) -> Self {
        AppError::ServerUnreachable(e.to_string())
    }
}

impl From<WxError> for AppError {
    fn from(e: WxError) -> Self {
        match e {
            WxError::Backend(msg) => AppError::MessagingBackend(msg),
            WxError::Parse(msg) => AppError::Validation(msg),
            WxError::IpTable(e) => AppError::Internal(e.to_string()),
            WxError::Store(e) => AppError::from(e),
        }
    }
}
