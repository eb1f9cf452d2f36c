//! Bulk REST API Server
//!
//! This binary starts the bulk API server: batch intake, background
//! processing against the inventory service and report downloads.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use bulk_client::InventoryClient;

use bulk_server::{AppState, ServerConfig, create_router};

/// How long running batches get to wind down after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Parse command line arguments
    let config = ServerConfig::parse();

    let processor_config = config.processor_config();
    processor_config
        .validate()
        .context("Invalid processor configuration")?;

    // Connect to database
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    bulk_db::run_migrations(&pool)
        .await
        .context("Failed to apply database schema")?;
    info!("Database connection established");

    let (logical, physical) = InventoryClient::pair(&config.inventory_url, config.inventory_config())
        .context("Failed to initialize inventory client")?;
    info!(
        inventory = %config.inventory_url,
        workers = processor_config.workers,
        call_timeout_secs = processor_config.call_timeout.as_secs(),
        max_attempts = processor_config.retry.max_attempts,
        "Inventory client ready"
    );

    // Create shutdown token for graceful shutdown
    let shutdown_token = CancellationToken::new();

    // Create application state
    let app_state = AppState::new(
        pool,
        logical,
        physical,
        processor_config,
        shutdown_token.clone(),
    );
    let tasks = app_state.tasks.clone();

    // Build router
    let app = create_router(app_state, &config);

    // Bind to address
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid address")?;

    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("Starting bulk API server on http://{}", addr);
    info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_token))
        .await
        .context("Server error")?;

    // Cancelled runs stop dispatching; let in-flight items and reports finish
    tasks.close();
    if tokio::time::timeout(SHUTDOWN_GRACE, tasks.wait()).await.is_err() {
        warn!(
            running = tasks.len(),
            "Batch runs still active after shutdown grace period"
        );
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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

    // Cancel the shutdown token to stop dispatching in running batches
    shutdown_token.cancel();
}
