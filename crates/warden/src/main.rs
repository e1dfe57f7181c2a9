//! Warden server entry point.

use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use warden::challenge::{ChallengeStore, expiry_worker};
use warden::config::{AppConfig, StoreBackend};
use warden::routes::create_router;
use warden::state::AppState;
use warden::Args;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.json_logs)?;

    info!("🛡️ Starting Warden v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::load(&args.config, &args)?;
    info!("📋 Configuration loaded from {}", args.config);

    // Create shutdown broadcast channel
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    // Connect the challenge store
    let store = match config.store_backend {
        StoreBackend::Redis => {
            let store = ChallengeStore::connect_redis(&config.redis_url, config.challenge.ttl_secs)
                .await
                .context("Failed to connect to Redis")?;
            info!("✅ Redis connected: {}", config.redis_url);
            store
        }
        StoreBackend::Memory => {
            let store = ChallengeStore::memory(config.challenge.ttl_secs);

            // Redis reaps via key expiry; the memory backend needs a sweeper
            let sweep_store = store.clone();
            let sweep_interval = Duration::from_secs(config.challenge.sweep_interval_secs);
            let sweep_shutdown = shutdown_tx.subscribe();
            tokio::spawn(async move {
                expiry_worker(sweep_store, sweep_interval, sweep_shutdown).await;
            });

            info!("✅ In-memory challenge store initialized");
            store
        }
    };

    // Initialize application state
    let state = AppState::new(config.clone(), store)?;

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("🚀 Warden listening on {}", config.listen_addr);

    // Handle graceful shutdown
    let shutdown_signal = async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("🛑 Shutdown signal received");
        let _ = shutdown_tx.send(());
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    info!("👋 Warden shutdown complete");
    Ok(())
}

/// Initialize structured logging with tracing
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .init();
    }

    Ok(())
}
