//! # board_api
//!
//! HTTP API library for Redis Board.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod rest;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use board_core::probe::{RedisClient, RedisProbe};
use board_core::wx::MessageDispatcher;
use board_core::wx::client::{ProfileClient, WeChatProfileClient};
use board_core::wx::handlers::{HandlerDeps, default_dispatcher};
use board_core::wx::ip::{IpLocator, RangeTable};
use board_core::wx::WxError;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ApiConfig;
use crate::handlers::{auth, servers, users, wx};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection pool.
    pub pool: SqlitePool,
    /// API configuration.
    pub config: ApiConfig,
    /// Redis health and metrics.
    pub probe: Arc<dyn RedisProbe>,
    /// Chat message routing.
    pub dispatcher: Arc<MessageDispatcher>,
}

impl AppState {
    /// Build state with the real Redis client and, when app credentials are
    /// configured, a platform profile client.
    pub fn new(pool: SqlitePool, config: ApiConfig) -> Result<Self, WxError> {
        let probe: Arc<dyn RedisProbe> = Arc::new(RedisClient::new(config.backend_timeout));
        let profile = match config.wx_credentials() {
            Some((app_id, app_secret)) => Some(Arc::new(WeChatProfileClient::new(
                &config.wx_api_base,
                app_id,
                app_secret,
                config.backend_timeout,
            )?) as Arc<dyn ProfileClient>),
            None => {
                info!("WX_APP_ID/WX_APP_SECRET not set, subscriber profiles disabled");
                None
            }
        };
        Self::with_backends(pool, config, probe, profile)
    }

    /// Build state around the given backends.
    pub fn with_backends(
        pool: SqlitePool,
        config: ApiConfig,
        probe: Arc<dyn RedisProbe>,
        profile: Option<Arc<dyn ProfileClient>>,
    ) -> Result<Self, WxError> {
        let locator: Arc<dyn IpLocator> = match &config.ip_data_path {
            Some(path) => Arc::new(RangeTable::load(path)?),
            None => Arc::new(RangeTable::empty()),
        };
        let dispatcher = default_dispatcher(HandlerDeps {
            pool: pool.clone(),
            probe: probe.clone(),
            secret_key: config.secret_key.clone(),
            public_url: config.public_url.clone(),
            profile,
            locator,
        });
        Ok(Self {
            pool,
            config,
            probe,
            dispatcher: Arc::new(dispatcher),
        })
    }
}

/// Run embedded database migrations.
///
/// Delegates to `board_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    board_core::migrate::migrate(pool).await
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no token required)
    let public = Router::new()
        .route("/login", post(auth::login_handler))
        .route("/wx", get(wx::verify_endpoint).post(wx::receive_message))
        .route("/wx/bind/{wx_id}", get(wx::bind_form).post(wx::bind_account));

    // Protected routes; admin-only ones also extract `AdminUser`
    let protected = Router::new()
        .route("/servers", get(servers::list_servers).post(servers::create_server))
        .route(
            "/servers/{id}",
            get(servers::get_server)
                .put(servers::update_server)
                .delete(servers::delete_server),
        )
        .route("/servers/{id}/metrics", get(servers::server_metrics))
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_token,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
