// Condo Expenses - Web Server
// REST API with Axum

use anyhow::{Context, Result};
use axum::Router;
use clap::Parser;
use tracing::info;

use condo_expenses::config::{init_tracing, ServerConfig};
use condo_expenses::{open_database, router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let config = ServerConfig::parse();

    let conn = open_database(&config.database.path)?;
    info!(path = %config.database.path.display(), "database opened");

    let state = AppState::new(conn).with_page_size(config.effective_page_size());
    let app = Router::new().nest("/api", router(state));

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(addr = %config.bind, "server running, API under /api");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
