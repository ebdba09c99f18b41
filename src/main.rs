//! window-stats server
//!
//! Serves `POST /transactions` and `GET /statistics` over a trailing window.
//!
//! Environment:
//!   TRANSACTION_LIFE_MILLIS - Window length in milliseconds (required)
//!   DECIMAL_SCALE - Fractional digits for amounts (default: 3)
//!   BIND_ADDR - Listen address (default: 0.0.0.0:3000)
//!   ENGINE_QUEUE_CAPACITY - Buffered inserts before producers wait (default: 1024)

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use window_stats::{api, Config, StatisticsService};

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let config = Config::parse();
    let service = StatisticsService::start(&config).context("Invalid configuration")?;

    info!(
        window_ms = config.transaction_life_millis,
        scale = config.decimal_scale,
        queue_capacity = config.queue_capacity,
        "Window engine started"
    );

    let app = api::create_router(Arc::new(service)).layer(CorsLayer::permissive());

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("API server listening on {}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

/// Initialize tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "window_stats=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // Also try the crate directory, for runs with --manifest-path from elsewhere
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
