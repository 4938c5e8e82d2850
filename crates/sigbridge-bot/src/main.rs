//! sigbridge - Entry Point
//!
//! Receives BUY/SELL webhook signals and keeps one OKX perpetual position
//! on the signalled side.

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use sigbridge_bot::config::DEFAULT_CONFIG_PATH;
use sigbridge_bot::{AppConfig, Application};
use tracing::{info, warn};

/// Webhook-to-exchange trading signal bridge
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via SIGBRIDGE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets may live in .env; a missing file is fine.
    let dotenv = dotenvy::dotenv();

    let args = Args::parse();

    // Determine config path: CLI arg > SIGBRIDGE_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("SIGBRIDGE_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    let mut config = AppConfig::load(&config_path)?;

    sigbridge_telemetry::init_logging(&config.logging)?;

    info!("Starting sigbridge v{}", env!("CARGO_PKG_VERSION"));
    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded environment file"),
        Err(e) if e.not_found() => {}
        Err(e) => warn!(error = %e, "Failed to load .env file"),
    }
    if Path::new(&config_path).exists() {
        info!(config_path = %config_path, "Configuration loaded");
    } else {
        warn!(config_path = %config_path, "Config file not found, using defaults");
    }

    config.apply_env();
    config.validate()?;

    let app = Application::new(config)?;
    app.run().await?;

    Ok(())
}
