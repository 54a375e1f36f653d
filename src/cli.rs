// src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sample a process's memory usage under synthetic load and save it as CSV.
///
/// `memsampler.yaml` holds the defaults; CLI flags override them.
#[derive(Parser, Debug)]
#[command(name = "memsampler", version, disable_help_subcommand = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// All supported CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one sampling window.
    ///
    /// Prints one line per sample, stops early on Ctrl-C and writes the
    /// collected samples to CSV when the run ends.
    Run {
        /// Path to config file
        #[arg(short, long, default_value = "memsampler.yaml")]
        config: PathBuf,

        /// Override run duration in seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Override sampling interval in milliseconds
        #[arg(long)]
        interval: Option<u64>,

        /// Sample this pid instead of memsampler itself
        #[arg(long)]
        pid: Option<u32>,

        /// Write the CSV into exactly this directory (no fallbacks)
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Do not start the synthetic load worker
        #[arg(long)]
        no_load: bool,
    },

    /// Print a single memory snapshot as JSON.
    Snapshot {
        /// Path to config file
        #[arg(short, long, default_value = "memsampler.yaml")]
        config: PathBuf,

        /// Process to inspect (defaults to memsampler itself)
        #[arg(long)]
        pid: Option<u32>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Write a default memsampler.yaml into the current directory.
    Init,
}
