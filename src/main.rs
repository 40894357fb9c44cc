use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rollcall::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "rollcall",
    version,
    about = "Offline-resilient attendance capture and sync",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML); environment variables are used otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a single scan
    Scan {
        /// Tag identifier read from the card
        tag: String,
    },

    /// Drain the offline queue now
    Sync,

    /// Show pending records and connectivity
    Status {
        /// Also print Prometheus metrics
        #[arg(long, default_value = "false")]
        metrics: bool,
    },

    /// Read scans from stdin, one per line, and sync on reconnect
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::from_env().context("Failed to load config from environment")?,
    };
    config.validate()?;

    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    if let Err(e) = rollcall::metrics::init_metrics() {
        tracing::warn!(error = %e, "Metrics disabled");
    }

    tracing::debug!(
        sink = %config.sink.url,
        backend = %config.storage.backend,
        "rollcall starting"
    );

    match cli.command {
        Commands::Scan { tag } => {
            tracing::info!(tag = %tag, "Starting scan command");
            commands::scan(config, tag).await?;
        }

        Commands::Sync => {
            tracing::info!("Starting sync command");
            commands::sync(config).await?;
        }

        Commands::Status { metrics } => {
            commands::status(config, metrics).await?;
        }

        Commands::Watch => {
            tracing::info!("Starting watch command");
            commands::watch(config).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("rollcall=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("rollcall={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
