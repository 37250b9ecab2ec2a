//! Hostwatch CLI
//!
//! Command-line interface for the host health monitor.

use std::path::PathBuf;

use clap::Parser;
use hostwatch::{load_config, HostwatchBuilder};
use tracing::Level;

#[derive(Parser)]
#[command(name = "hostwatch")]
#[command(about = "Host, container and endpoint health monitor with webhook alerts")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    /// Run every check once and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, log_level={:?}, once={}",
        args.config,
        args.log_level,
        args.once
    );

    let mut config = load_config(&args.config)?;
    config.resolve_secrets()?;

    tracing::info!("Starting hostwatch");
    tracing::debug!(
        "Interval: {}s, containers: {}, http checks: {}, tcp checks: {}",
        config.general.check_interval_seconds,
        config.docker.containers.len(),
        config.functional.http_checks.len(),
        config.functional.tcp_checks.len()
    );

    let hostwatch = HostwatchBuilder::new(config).build()?;
    if args.once {
        hostwatch.run_once().await;
    } else {
        hostwatch.start().await?;
    }

    Ok(())
}
