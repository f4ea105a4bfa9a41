//! Redis Board API server binary.
//!
//! Opens the SQLite database, applies migrations, seeds the first
//! administrator when the user table is empty, then serves the REST API and
//! the WeChat webhook until Ctrl-C.

use board_api::config::{ApiConfig, DEFAULT_ADMIN_PASSWORD};
use board_core::store;
use clap::Parser;
use tracing::{info, warn};

/// CLI arguments for the API server. Everything not listed here is read
/// from the environment by `ApiConfig::from_env`.
#[derive(Parser, Debug)]
#[command(name = "board_server", about = "Redis Board API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:5000")]
    bind_addr: String,

    /// SQLite connection URL.
    #[arg(long, env = "DATABASE_URL", default_value = board_core::db::DEFAULT_DATABASE_URL)]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,board_api=debug,board_core=debug")),
        )
        .init();

    let args = Args::parse();

    let config = ApiConfig {
        bind_addr: args.bind_addr,
        database_url: args.database_url,
        ..ApiConfig::from_env()
    };

    info!(database_url = %config.database_url, "starting board_server");
    if config.uses_default_secret_key() {
        warn!("SECRET_KEY is not set; stored Redis passwords use the built-in development key");
    }

    let pool = board_core::db::connect(&config.database_url, args.max_connections).await?;

    info!("running database migrations");
    board_api::migrate(&pool).await?;

    if let Some(admin) = store::users::ensure_default_admin(
        &pool,
        &config.admin_name,
        &config.admin_email,
        &config.admin_password,
    )
    .await?
    {
        info!(name = %admin.name, "created default administrator");
        if config.admin_password == DEFAULT_ADMIN_PASSWORD {
            warn!("default administrator uses the default password; change it");
        }
    }

    let state = board_api::AppState::new(pool, config.clone())?;
    let app = board_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;

    Ok(())
}
