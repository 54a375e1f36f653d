// src/main.rs

//! memsampler
//!
//! Entry point for the memsampler CLI.
//!
//! Responsibilities of this file:
//! - Initialise logging
//! - Parse CLI arguments
//! - Hand off execution to the runner
//!
//! The sampler runs on a single-threaded runtime: ticks, samples and the
//! live view all stay on the main thread, the load worker gets its own
//! OS thread.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use memsampler::{cli, runner};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    runner::run(cli).await
}
