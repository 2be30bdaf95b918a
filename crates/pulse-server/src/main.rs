//! # pulse-server
//!
//! Telemetry hub binary: wires config, logging and metrics together and
//! starts the HTTP/WebSocket server.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pulse_server::config;
use pulse_server::server::PulseServer;

/// Telemetry hub server.
#[derive(Parser, Debug)]
#[command(name = "pulse-server", about = "Industrial telemetry hub")]
struct Cli {
    /// Host to bind (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides config; 0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Path to a JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // PULSE_LOG controls verbosity, e.g. PULSE_LOG=pulse_hub=debug,info
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("PULSE_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Cli::parse();
    let mut cfg = config::load(args.config.as_deref()).context("failed to load config")?;
    if let Some(host) = args.host {
        cfg.host = host;
    }
    if let Some(port) = args.port {
        cfg.port = port;
    }

    let metrics_handle = pulse_server::metrics::install_recorder();
    let server = PulseServer::new(cfg).with_metrics_handle(metrics_handle);
    let (addr, handle) = server.listen().await.context("failed to bind server")?;
    tracing::info!("telemetry hub listening on http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    tracing::info!("shutting down...");
    server.shutdown().graceful_shutdown(vec![handle], None).await;
    tracing::info!("shutdown complete");
    Ok(())
}
