//! Shared fixtures for API integration tests: an in-memory database with a
//! seeded administrator, a fake Redis probe and request helpers.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use board_api::config::ApiConfig;
use board_api::{AppState, router};
use board_core::auth::jwt;
use board_core::models::user::{NewUser, UserRow};
use board_core::probe::{ProbeError, RedisProbe, RedisTarget};
use board_core::store;
use serde_json::{Map, Value, json};
use sqlx::SqlitePool;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test-secret";
pub const WX_TOKEN: &str = "wx-token";

/// Reachable only at `127.0.0.1`; `INFO` reports a fixed version.
pub struct FakeProbe;

#[async_trait]
impl RedisProbe for FakeProbe {
    async fn ping(&self, target: &RedisTarget) -> Result<bool, ProbeError> {
        if target.host == "127.0.0.1" {
            Ok(true)
        } else if target.host == "127.0.0.2" {
            // Answers, but not with PONG.
            Ok(false)
        } else {
            Err(ProbeError::Unreachable {
                host: target.host.clone(),
            })
        }
    }

    async fn info(&self, target: &RedisTarget) -> Result<Map<String, Value>, ProbeError> {
        self.ping(target).await?;
        let mut info = Map::new();
        info.insert("redis_version".into(), json!("7.2.4"));
        info.insert("connected_clients".into(), json!(1));
        Ok(info)
    }
}

pub fn test_config() -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        database_url: "sqlite::memory:".into(),
        jwt_secret: JWT_SECRET.into(),
        secret_key: "test-key".into(),
        wx_token: WX_TOKEN.into(),
        wx_app_id: None,
        wx_app_secret: None,
        wx_api_base: "http://127.0.0.1:1".into(),
        public_url: "http://board.test".into(),
        ip_data_path: None,
        backend_timeout: Duration::from_millis(200),
        admin_name: "admin".into(),
        admin_email: "admin@example.com".into(),
        admin_password: "123456".into(),
    }
}

/// Router, pool and the seeded administrator.
pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    pub admin: UserRow,
}

impl TestApp {
    pub async fn new() -> Self {
        let pool = board_core::db::memory().await.expect("memory pool");
        let admin = store::users::ensure_default_admin(&pool, "admin", "admin@example.com", "123456")
            .await
            .expect("seed admin")
            .expect("empty database");
        let state = AppState::with_backends(pool.clone(), test_config(), Arc::new(FakeProbe), None)
            .expect("state");
        Self {
            app: router(state),
            pool,
            admin,
        }
    }

    pub fn admin_token(&self) -> String {
        jwt::issue_token(self.admin.id, true, JWT_SECRET).expect("token")
    }

    /// Create a regular user and return a token for it.
    pub async fn user_token(&self, name: &str) -> (UserRow, String) {
        let user = store::users::create(
            &self.pool,
            &NewUser {
                name: name.into(),
                email: format!("{name}@example.com"),
                password: Some("123456".into()),
                is_admin: false,
            },
        )
        .await
        .expect("create user");
        let token = jwt::issue_token(user.id, false, JWT_SECRET).expect("token");
        (user, token)
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let resp = self.app.clone().oneshot(request).await.expect("request");
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        TestResponse {
            status,
            content_type,
            body: body.to_vec(),
        }
    }

    /// JSON request with an optional `JWT` token.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("JWT {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).expect("build request")).await
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("JSON body")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn message(&self) -> String {
        self.json()["message"].as_str().unwrap_or_default().to_string()
    }
}
