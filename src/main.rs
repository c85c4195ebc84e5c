use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use ragbot_backend::core::config::service::parse_app_config;
use ragbot_backend::core::config::{AppPaths, ConfigService};
use ragbot_backend::core::logging;
use ragbot_backend::server;
use ragbot_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let config_service = ConfigService::new(paths.clone());
    let raw_config = config_service
        .load_config()
        .context("Failed to load configuration")?;
    tracing::debug!(
        "Loaded configuration from {}: {}",
        config_service.config_path().display(),
        config_service.redact_sensitive_values(&raw_config)
    );
    let config = parse_app_config(raw_config).context("Invalid configuration")?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::initialize(paths, config)
        .await
        .context("Failed to initialize application state")?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
