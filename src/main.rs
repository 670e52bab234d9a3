#![warn(clippy::all, clippy::pedantic)]

use anyhow::Result;
use clap::Parser;
use feedwarden::app::dispatch::dispatch;
use feedwarden::cli::Cli;
use feedwarden::{Config, WardenError};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> ExitCode {
    // Both ring and aws-lc-rs may be linked; pick one explicitly.
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: Failed to install default crypto provider: {e:?}");
    }

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(WardenError::from(err).exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let builder = FmtSubscriber::builder().with_max_level(level);
    if config.log_timestamps {
        tracing::subscriber::set_global_default(builder.finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.without_time().finish())?;
    }

    dispatch(cli, Arc::new(config)).await
}
