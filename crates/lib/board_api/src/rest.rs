//! JSON envelope shared by every REST endpoint.
//!
//! Bodies are serialized with a trailing newline and served as
//! `application/json; charset=utf-8`, errors included.

use axum::extract::FromRequest;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::error;

use crate::error::AppError;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Serialize `value` into a JSON response with the given status.
pub fn json_response<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(mut body) => {
            body.push(b'\n');
            (
                status,
                [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
                body,
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "response serialization failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// JSON request body and JSON response in the board's envelope.
///
/// As an extractor, malformed bodies become [`AppError::Validation`].
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct RestJson<T>(pub T);

impl<T: Serialize> IntoResponse for RestJson<T> {
    fn into_response(self) -> Response {
        json_response(StatusCode::OK, &self.0)
    }
}

/// `201 Created` with a JSON body.
#[derive(Debug, Clone)]
pub struct Created<T>(pub T);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        json_response(StatusCode::CREATED, &self.0)
    }
}

/// `{"ok": true}`.
pub fn ok() -> RestJson<Value> {
    RestJson(json!({ "ok": true }))
}

/// `204 No Content`, still labelled as JSON.
pub fn no_content() -> Response {
    (
        StatusCode::NO_CONTENT,
        [(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
    )
        .into_response()
}
