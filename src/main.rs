mod cli;
mod config;
mod error;
mod logging;
mod model;
mod repository;
mod sync;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::error;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{e:#}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::SyncFields(args) => {
            // Per-issue failures are already logged; they don't fail the run.
            cli::run_sync_fields(&args, &config).await?;
        }
    }
    Ok(())
}
