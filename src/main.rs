// src/main.rs

//! hspoll
//!
//! Entry point for the hspoll CLI.
//!
//! Responsibilities of this file:
//! - Load `.env` so tokens can live in a dotfile
//! - Parse CLI arguments
//! - Initialise logging and the async runtime
//! - Hand off execution to the runner
//!
//! There is intentionally *no business logic* here.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use hspoll::{cli, runner};

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    // Delegate execution to the runner
    runner::run(cli).await
}
