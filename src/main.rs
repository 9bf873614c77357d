//! Payload-routing TCP reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!   client ──▶ net::listener ──▶ net::handler ─┬─▶ routing::classifier  (streaming?)
//!              (permit+accept)   (per task)    ├─▶ routing::router      (JSON body rule,
//!                                              │                         Host: fallback)
//!                                              ├─▶ dial backend
//!                                              └─▶ relay::{bounded, streaming}
//!                                                         │
//!   client ◀──────────────────────────────────────────────┘◀──▶ backend
//! ```

use std::path::PathBuf;

use clap::Parser;

use payload_proxy::config::load_config;
use payload_proxy::lifecycle::{wait_for_signal, Shutdown};
use payload_proxy::observability::{init_logging, init_metrics};
use payload_proxy::ProxyServer;

#[derive(Parser)]
#[command(name = "payload-proxy")]
#[command(about = "TCP reverse proxy routing on request payload fields", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    init_logging(&config.observability)?;

    tracing::info!(
        config = %cli.config.display(),
        endpoints = config.endpoints.len(),
        listen = %config.listen_address(),
        max_connections = config.max_connections,
        "Configuration loaded"
    );

    if cli.check {
        tracing::info!("Configuration is valid");
        return Ok(());
    }

    if config.observability.metrics_enabled {
        // Validation guarantees the address parses.
        init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let server = ProxyServer::bind(&config).await?;

    let shutdown = Shutdown::new();
    let accept_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(accept_shutdown).await;

    tracing::info!("Shutdown complete");
    Ok(())
}
