//! AI admission gateway (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!   POST /v1/generate
//!        │
//!        ▼
//!   ┌─────────┐    ┌──────────────┐    ┌──────────────┐    ┌──────────┐
//!   │  http   │───▶│    dedup     │───▶│    queue     │───▶│ breaker  │───▶ AI provider
//!   │ handler │    │ (same key →  │    │ priority,    │    │ fail fast│
//!   └─────────┘    │  one call)   │    │ concurrency, │    └──────────┘
//!                  └──────────────┘    │ deadline,    │
//!                                      │ retry        │
//!                                      └──────────────┘
//!
//!   Cross-cutting: config · observability · lifecycle · admin
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use ai_gate::config::{default_config, load_config};
use ai_gate::lifecycle::{wait_for_signal, Shutdown};
use ai_gate::observability::{logging, metrics};
use ai_gate::HttpServer;

#[derive(Parser)]
#[command(name = "ai-gate")]
#[command(about = "Admission-control gateway for AI provider calls", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => default_config()?,
    };

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?args.config,
        "ai-gate starting"
    );
    tracing::info!(
        bind_address = %config.server.bind_address,
        max_concurrent = config.queue.max_concurrent,
        max_queue_size = config.queue.max_queue_size,
        retry_attempts = config.queue.retry_attempts,
        failure_threshold = config.breaker.failure_threshold,
        dedup_ttl_ms = config.dedup.ttl_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let sweeper = server
        .state()
        .controller
        .deduplicator()
        .spawn_sweeper(shutdown.subscribe());
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_signal().await;
    tracing::info!("Shutdown signal received");
    shutdown.trigger();

    server_task.await??;
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "Dedup sweeper ended abnormally");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
