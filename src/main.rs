//! Audito service (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ http (router, middleware) ──▶ analysis orchestrator
//!                                                │
//!         ┌──────────────┬──────────────┬────────┴─────┬──────────────┐
//!         ▼              ▼              ▼              ▼              ▼
//!     validation     security        cache        upstream      normalize
//!    (file / URL)  (rate limit)   (TTL store)  (fetch, capture,  (model text
//!                                                 analyzer)      → result)
//!
//!     Cross-cutting: config, observability, resilience, lifecycle
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use audito::config::{load_config, AppConfig};
use audito::lifecycle::{spawn_signal_listener, Shutdown};
use audito::observability::{init_logging, metrics};
use audito::HttpServer;

#[derive(Parser)]
#[command(name = "audito")]
#[command(about = "UX critique service for UI screenshots and web pages", long_about = None)]
struct Args {
    /// Path to a TOML config file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "audito starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        rate_limiting = config.rate_limit.enabled,
        admin = config.admin.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
