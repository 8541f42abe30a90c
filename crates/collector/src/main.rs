//! sluiced - multi-source log collector daemon
//!
//! # Usage
//!
//! ```bash
//! # Run with defaults (data/ under the working directory)
//! sluiced
//!
//! # Explicit settings file and log level
//! sluiced --config /etc/sluice/sluice.toml --log-level debug
//! ```
//!
//! Exit codes: 0 on clean stop, 1 on fatal initialization errors,
//! 2 when a listener port cannot be bound at startup.

mod serve;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Sluice - multi-source log ingestion pipeline
#[derive(Parser, Debug)]
#[command(name = "sluiced")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the settings file
    #[arg(short, long, default_value = "sluice.toml", global = true)]
    config: PathBuf,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the collector (default when no subcommand is given)
    Serve,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Serve) | None => {
            serve::run(serve::ServeArgs {
                config: cli.config,
                log_level: cli.log_level,
            })
            .await
        }
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}
