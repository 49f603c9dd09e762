//! Vertibay — Warehouse Console Telemetry Engine
//!
//! Headless runner for the telemetry reconciliation and fault-routing
//! engine. Connects to a live machine controller, polls all telemetry
//! sources, and logs every navigation decision the reconciler makes.
//!
//! # Usage
//!
//! ```bash
//! # Run against a controller, bay 1
//! vertibay --controller-url http://192.168.0.10:5000 --bay 1
//!
//! # One-shot diagnostic: force a refresh, print the snapshot, exit
//! vertibay --controller-url http://192.168.0.10:5000 --once
//! ```
//!
//! # Environment Variables
//!
//! - `VERTIBAY_CONFIG`: Path to a TOML configuration file
//! - `VERTIBAY_CONTROLLER_URL`: Controller base URL (overridden by --controller-url)
//! - `RUST_LOG`: Logging level (default: info)

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use vertibay::{ConsoleConfig, ConsoleShell, HttpAutomationClient, LoggingNavigator};

#[derive(Parser, Debug)]
#[command(name = "vertibay")]
#[command(about = "Warehouse Console Telemetry Engine")]
#[command(version)]
struct CliArgs {
    /// Machine controller base URL
    #[arg(long, env = "VERTIBAY_CONTROLLER_URL")]
    controller_url: Option<String>,

    /// Bay number this console is installed at (1-3)
    #[arg(long)]
    bay: Option<u8>,

    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// Status poll interval override (ms)
    #[arg(long, value_name = "MS")]
    poll_interval_ms: Option<u64>,

    /// Refresh once, print the snapshot as JSON, and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => ConsoleConfig::load_from_file(std::path::Path::new(path))
            .with_context(|| format!("loading config from {path}"))?,
        None => ConsoleConfig::load(),
    };
    if let Some(url) = args.controller_url {
        config.controller_url = url;
    }
    if let Some(bay) = args.bay {
        config.bay_number = bay;
    }
    if let Some(ms) = args.poll_interval_ms {
        config.poll.status_ms = ms;
    }

    info!(
        controller = %config.controller_url,
        bay = config.bay_number,
        "Starting console telemetry engine"
    );

    let client = Arc::new(
        HttpAutomationClient::new(&config.controller_url)
            .context("building controller HTTP client")?,
    );

    // No realtime transport in the headless runner: poll-only, which is
    // also the console's fallback data path.
    let shell = ConsoleShell::new(config, client, None, Arc::new(LoggingNavigator));

    if args.once {
        shell.refresh().await;
        let snapshot = shell.aggregator().snapshot().borrow().clone();
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    shell.start().await;

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("Shutdown signal received");
    shell.shutdown().await;

    Ok(())
}
