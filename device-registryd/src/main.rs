mod api;
mod config;
mod legacy;
mod store;

use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use anyhow::{Context, Result};
use crate::config::Config;
use crate::store::{DeviceDb, DeviceStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("device_registryd=info"))
        )
        .init();

    tracing::info!("Starting device-registryd");

    // Load config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/device-registry/registryd.toml".to_string());

    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    tracing::info!("Loaded config from {}", config_path);

    // Open SQLite database
    let db = DeviceDb::open(&config.store.db_path)?;
    tracing::info!("Opened database at {:?}", config.store.db_path);

    // Start device store thread
    let store = DeviceStore::spawn(db);

    // Build API router
    let app_state = api::routes::AppState::new(store.clone(), &config.api);
    let app = api::routes::router(app_state);

    // Bind HTTP server
    let listener = tokio::net::TcpListener::bind(&config.api.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.api.listen))?;

    tracing::info!("API listening on {}", config.api.listen);
    match &config.api.real_ip_header {
        Some(header) => tracing::info!("Trusting client IP from header {}", header),
        None => tracing::info!("Using peer address as client IP"),
    }

    // Create cancellation token for graceful shutdown
    let cancel = CancellationToken::new();

    // Run server with graceful shutdown; peer address feeds the client IP
    let server_cancel = cancel.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { server_cancel.cancelled().await })
        .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutdown signal received");

    cancel.cancel();
    let _ = server_handle.await;

    // Shutdown store thread
    if let Err(e) = store.shutdown().await {
        tracing::error!("Failed to shutdown device store: {}", e);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
