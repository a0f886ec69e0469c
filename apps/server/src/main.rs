//! # Tally Server
//!
//! Entry point: tracing, configuration, database, HTTP listener.
//!
//! ```text
//! JWT_SECRET=... TALLY_DB_PATH=./tally.db cargo run -p tally-server
//! ```

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tally_db::{Database, DbConfig};
use tally_server::auth::JwtManager;
use tally_server::config::ServerConfig;
use tally_server::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting Tally server...");

    let config = ServerConfig::load().context("Failed to load configuration")?;
    info!(
        addr = %config.bind_address(),
        db_path = %config.database_path.display(),
        total_policy = %config.total_policy,
        "Configuration loaded"
    );

    let db = Database::new(
        DbConfig::new(&config.database_path).max_connections(config.db_max_connections),
    )
    .await
    .context("Failed to open database")?;

    let state = AppState::new(
        db.clone(),
        JwtManager::new(config.jwt_secret.clone()),
        config.total_policy,
    );
    let app = build_router(state, config.cors_allow_any);

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address()))?;
    info!(addr = %config.bind_address(), "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
