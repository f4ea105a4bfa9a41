//! Redis server management handlers.

use axum::extract::State;
use axum::response::Response;
use board_core::models::server::{ServerInput, ServerView};
use board_core::probe::ProbeError;
use board_core::store;
use serde_json::{Map, Value, json};
use tracing::info;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AdminUser;
use crate::middleware::object::ServerPath;
use crate::rest::{self, Created, RestJson};

/// `GET /servers`
pub async fn list_servers(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
) -> AppResult<RestJson<Vec<ServerView>>> {
    let rows = store::servers::list_all(&state.pool).await?;
    Ok(RestJson(rows.iter().map(ServerView::from).collect()))
}

/// `POST /servers`: register a server once it answers `PING`.
pub async fn create_server(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    RestJson(input): RestJson<ServerInput>,
) -> AppResult<Created<Value>> {
    let new = input.into_new()?;
    store::servers::ensure_unique(&state.pool, &new.name, None).await?;
    let target = new.target();
    if !state.probe.ping(&target).await? {
        return Err(ProbeError::Unreachable { host: target.host }.into());
    }

    let row = store::servers::create(&state.pool, &new, &state.config.secret_key).await?;
    info!(uid = admin.id, id = row.id, host = %row.host, "server registered");
    Ok(Created(json!({ "ok": true })))
}

/// `GET /servers/{id}`
pub async fn get_server(ServerPath(server): ServerPath) -> RestJson<ServerView> {
    RestJson(ServerView::from(&server))
}

/// `PUT /servers/{id}`: partial update; the merged record is revalidated.
pub async fn update_server(
    AdminUser(_): AdminUser,
    ServerPath(server): ServerPath,
    State(state): State<AppState>,
    RestJson(input): RestJson<ServerInput>,
) -> AppResult<RestJson<Value>> {
    let new = input.merge(&server).into_new()?;
    store::servers::update(&state.pool, &server, &new, &state.config.secret_key).await?;
    Ok(rest::ok())
}

/// `DELETE /servers/{id}`
pub async fn delete_server(
    AdminUser(_): AdminUser,
    ServerPath(server): ServerPath,
    State(state): State<AppState>,
) -> AppResult<Response> {
    store::servers::delete(&state.pool, server.id).await?;
    Ok(rest::no_content())
}

/// `GET /servers/{id}/metrics`: the server's `INFO`, as JSON.
pub async fn server_metrics(
    ServerPath(server): ServerPath,
    State(state): State<AppState>,
) -> AppResult<RestJson<Map<String, Value>>> {
    let target = server.target(&state.config.secret_key)?;
    let info = state.probe.info(&target).await?;
    Ok(RestJson(info))
}
