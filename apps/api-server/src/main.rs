//! # rxpos API server
//!
//! ```text
//! load config ──► open SQLite + migrate ──► bootstrap super-admin
//!                                                  │
//!                 graceful shutdown ◄── axum::serve ◄┘
//! ```

use std::net::SocketAddr;

use anyhow::Context;
use rxpos_api::auth::hash_password;
use rxpos_api::{create_router, ApiConfig, AppState};
use rxpos_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rxpos_api=info,rxpos_db=info,tower_http=info")),
        )
        .with_target(true)
        .init();

    info!("Starting rxpos API server...");

    let config = ApiConfig::load().context("invalid configuration")?;
    info!(
        port = config.http_port,
        database = %config.database_path,
        "Configuration loaded"
    );
    if config.uses_dev_secret() {
        warn!("JWT_SECRET is not set; using the development secret");
    }

    let db = Database::new(DbConfig::new(&config.database_path).max_connections(config.db_max_connections))
        .await
        .context("failed to open database")?;
    info!("Database ready");

    if let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) {
        let hash = hash_password(password).context("failed to hash admin password")?;
        let created = db
            .users()
            .ensure_super_admin(username, "Platform Admin", &hash)
            .await
            .context("failed to bootstrap super-admin")?;
        if created {
            info!(username = %username, "Super-admin created");
        }
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let state = AppState::new(db.clone(), config);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
