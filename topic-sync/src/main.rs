//! Topic Sync Web Server.
//!
//! Listens for Discourse post webhooks on `/webhooks/discourse/topic` and
//! keeps the comment counts of linked records in step with the forum. Records
//! live in memory, optionally seeded from `RECORDS_PATH` at start-up.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use topicsync::web::{discourse_topic_webhook, health, AppState};
use topicsync::{Config, MemoryRecordStore, StaticSettings, WebhookTopicSync};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        webhook_enabled = config.webhook_enabled,
        webhook_secret_configured = config.webhook_secret.is_some(),
        match_old_topics = config.match_old_topics,
        records_path = ?config.records_path,
        "config_loaded"
    );

    let store = match &config.records_path {
        Some(path) => MemoryRecordStore::from_json_file(path)
            .with_context(|| format!("Failed to load records from {}", path))?,
        None => MemoryRecordStore::new(),
    };
    info!(record_count = store.len(), "record_store_ready");

    let sync = WebhookTopicSync::new(
        Arc::new(StaticSettings(config.sync_config())),
        Arc::new(store),
    );

    // Create application state
    let state = AppState::new(sync);

    // Build the router
    let app = Router::new()
        .route("/health", get(health))
        .route("/webhooks/discourse/topic", post(discourse_topic_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
