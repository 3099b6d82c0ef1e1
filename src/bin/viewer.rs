//! TUI Dashboard Viewer
//!
//! Live onset-of-degradation dashboard for the IMS bearing test sets.
//! Streams every channel of the selected test set from the detection service.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

use sod_monitor::{Config, Dashboard, WsTransport, viewer::App};

#[derive(Parser, Debug)]
#[command(name = "sod-viewer")]
#[command(about = "Terminal dashboard for live bearing degradation detection", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Detection service WebSocket endpoint (overrides config and environment)
    #[arg(short, long, value_name = "URL")]
    endpoint: Option<String>,

    /// Dataset shown at startup
    #[arg(short, long, value_name = "ID")]
    dataset: Option<String>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Logs go to a file so they don't draw over the TUI
    let log_path = dirs::data_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_default()
        .join("sod-monitor")
        .join("viewer.log");

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path);

    match log_file {
        Ok(file) => {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_level(true)
                .with_ansi(false)
                .with_writer(file)
                .init();
        }
        Err(_) => {
            // If we can't create a log file, use a minimal stderr logger that only shows errors
            tracing_subscriber::fmt()
                .with_target(false)
                .with_level(true)
                .with_max_level(tracing::Level::ERROR)
                .init();
        }
    }

    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    config.apply_env();

    if let Some(endpoint) = args.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(dataset) = args.dataset {
        config.initial_dataset = Some(dataset);
    }

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    let settings = config
        .dashboard_settings()
        .context("Invalid dashboard configuration")?;

    tracing::info!(
        "starting viewer against {} with {} datasets",
        settings.endpoint,
        settings.registry.datasets().len()
    );

    let dashboard = Dashboard::start(settings, Arc::new(WsTransport))
        .await
        .context("Failed to start dashboard")?;

    let mut app = App::new(dashboard);
    app.run().await
}
