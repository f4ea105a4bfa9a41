//! API server configuration.

use std::path::PathBuf;
use std::time::Duration;

use board_core::auth::jwt::resolve_jwt_secret;
use board_core::wx::client::DEFAULT_API_BASE;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:5000").
    pub bind_addr: String,
    /// SQLite connection URL.
    pub database_url: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Passphrase for Redis server passwords at rest.
    pub secret_key: String,
    /// Shared token for webhook signatures.
    pub wx_token: String,
    pub wx_app_id: Option<String>,
    pub wx_app_secret: Option<String>,
    pub wx_api_base: String,
    /// External base URL, used in links sent to chat users.
    pub public_url: String,
    /// IP range table for `ip` lookups.
    pub ip_data_path: Option<PathBuf>,
    /// Upper bound for Redis and messaging backend calls.
    pub backend_timeout: Duration,
    /// Administrator seeded into an empty database.
    pub admin_name: String,
    pub admin_email: String,
    pub admin_password: String,
}

/// Password of the seeded administrator when none is configured.
pub const DEFAULT_ADMIN_PASSWORD: &str = "123456";

/// Passphrase sealing Redis server passwords when `SECRET_KEY` is unset.
pub const DEFAULT_SECRET_KEY: &str = "redis-board-default-dev-key-change-in-production";

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn var_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                        | Default                            |
    /// |---------------------------------|------------------------------------|
    /// | `BIND_ADDR`                     | `127.0.0.1:5000`                   |
    /// | `DATABASE_URL`                  | `sqlite://board.db?mode=rwc`       |
    /// | `JWT_SECRET` / `AUTH_SECRET`    | generated & persisted to file      |
    /// | `SECRET_KEY`                    | development key                    |
    /// | `WX_TOKEN`                      | empty                              |
    /// | `WX_APP_ID` / `WX_APP_SECRET`   | unset (no profile lookups)         |
    /// | `WX_API_BASE`                   | `https://api.weixin.qq.com`        |
    /// | `PUBLIC_URL`                    | `http://127.0.0.1:5000`            |
    /// | `IP_DATA_PATH`                  | unset (empty IP table)             |
    /// | `BACKEND_TIMEOUT_MS`            | `3000`                             |
    /// | `ADMIN_NAME` / `ADMIN_EMAIL` / `ADMIN_PASSWORD` | `admin` / `admin@example.com` / `123456` |
    pub fn from_env() -> Self {
        let timeout_ms = var_opt("BACKEND_TIMEOUT_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(3000);
        Self {
            bind_addr: var_or("BIND_ADDR", "127.0.0.1:5000"),
            database_url: var_or("DATABASE_URL", board_core::db::DEFAULT_DATABASE_URL),
            jwt_secret: resolve_jwt_secret(),
            secret_key: var_or("SECRET_KEY", DEFAULT_SECRET_KEY),
            wx_token: var_or("WX_TOKEN", ""),
            wx_app_id: var_opt("WX_APP_ID"),
            wx_app_secret: var_opt("WX_APP_SECRET"),
            wx_api_base: var_or("WX_API_BASE", DEFAULT_API_BASE),
            public_url: var_or("PUBLIC_URL", "http://127.0.0.1:5000"),
            ip_data_path: var_opt("IP_DATA_PATH").map(PathBuf::from),
            backend_timeout: Duration::from_millis(timeout_ms),
            admin_name: var_or("ADMIN_NAME", "admin"),
            admin_email: var_or("ADMIN_EMAIL", "admin@example.com"),
            admin_password: var_or("ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD),
        }
    }

    /// Whether stored Redis passwords are sealed with the built-in key.
    pub fn uses_default_secret_key(&self) -> bool {
        self.secret_key == DEFAULT_SECRET_KEY
    }

    /// App id and secret, when both are configured.
    pub fn wx_credentials(&self) -> Option<(&str, &str)> {
        Some((self.wx_app_id.as_deref()?, self.wx_app_secret.as_deref()?))
    }
}
