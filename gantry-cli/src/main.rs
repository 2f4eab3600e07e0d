//! Gantry CLI
//!
//! Command-line front end for the pipeline orchestrator: evaluate a
//! trigger, or run a built-in or file-based pipeline for an event.

mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::{Commands, handle_command};
use gantry_runner::Config;

#[derive(Parser)]
#[command(name = "gantry")]
#[command(about = "Gantry pipeline orchestrator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gantry_runner=info,gantry_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.validate()?;

    handle_command(cli.command, &config).await
}
