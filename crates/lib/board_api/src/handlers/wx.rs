//! WeChat webhook and account binding.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use board_core::wx::Message;
use board_core::wx::signature;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::rest::RestJson;
use crate::services::auth::Credentials;
use crate::services::wx as bind_service;

const INVALID_USER_DATA: &str = "Invalid user data.";

/// Query parameters the platform adds to every webhook call.
#[derive(Debug, Default, Deserialize)]
pub struct SignatureQuery {
    pub signature: Option<String>,
    pub timestamp: Option<String>,
    pub nonce: Option<String>,
    pub echostr: Option<String>,
}

fn check_signature(state: &AppState, query: &SignatureQuery) -> AppResult<()> {
    let (Some(sig), Some(timestamp), Some(nonce)) = (
        query.signature.as_deref(),
        query.timestamp.as_deref(),
        query.nonce.as_deref(),
    ) else {
        return Err(AppError::SignatureMismatch);
    };
    if !signature::verify(&state.config.wx_token, timestamp, nonce, sig) {
        warn!(timestamp, "webhook signature mismatch");
        return Err(AppError::SignatureMismatch);
    }
    Ok(())
}

/// `GET /wx`: endpoint verification, echoes `echostr`.
pub async fn verify_endpoint(
    State(state): State<AppState>,
    Query(query): Query<SignatureQuery>,
) -> AppResult<String> {
    check_signature(&state, &query)?;
    Ok(query.echostr.unwrap_or_default())
}

/// `POST /wx`: route an inbound message and answer with the reply XML.
pub async fn receive_message(
    State(state): State<AppState>,
    Query(query): Query<SignatureQuery>,
    body: String,
) -> AppResult<Response> {
    check_signature(&state, &query)?;
    let message = Message::parse(&body)?;
    debug!(from = message.source(), msg_type = %message.msg_type, "inbound message");

    let reply = state.dispatcher.dispatch(&message).await?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/xml; charset=utf-8"))],
        reply.render(),
    )
        .into_response())
}

/// `GET /wx/bind/{wx_id}`: the bind form.
pub async fn bind_form(Path(_wx_id): Path<String>) -> Html<&'static str> {
    Html(BIND_PAGE)
}

/// `POST /wx/bind/{wx_id}`: link the account to the user in the body.
pub async fn bind_account(
    State(state): State<AppState>,
    Path(wx_id): Path<String>,
    body: Bytes,
) -> AppResult<RestJson<Value>> {
    let credentials: Credentials = serde_json::from_slice(&body)
        .map_err(|_| AppError::Validation(INVALID_USER_DATA.into()))?;
    bind_service::bind(&state.pool, &wx_id, &credentials).await?;
    Ok(RestJson(json!({ "ok": true, "message": bind_service::BOUND })))
}

const BIND_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Bind Redis Board account</title>
<style>
body { font-family: sans-serif; max-width: 24rem; margin: 2rem auto; padding: 0 1rem; }
label, input, button { display: block; width: 100%; margin-top: .5rem; }
#result { margin-top: 1rem; }
</style>
</head>
<body>
<h1>Bind Redis Board account</h1>
<form id="bind">
<label>User name or email <input name="name" required></label>
<label>Password <input name="password" type="password" required></label>
<button type="submit">Bind</button>
</form>
<p id="result"></p>
<script>
document.getElementById('bind').addEventListener('submit', async (event) => {
  event.preventDefault();
  const form = new FormData(event.target);
  const resp = await fetch(window.location.pathname, {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ name: form.get('name'), password: form.get('password') }),
  });
  const data = await resp.json();
  document.getElementById('result').textContent = data.message;
});
</script>
</body>
</html>
"#;
