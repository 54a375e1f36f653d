// src/runner.rs

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::memory::{procfs::ProcFsProvider, SnapshotProvider};
use crate::sampler::{SaveResult, Sampler};
use crate::sinks::console::ConsoleSink;
use crate::util::OutputLocator;
use crate::validate::validate_config;

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Entry point from `main.rs`.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Init => init_scaffold(Path::new("memsampler.yaml")),

        Command::Snapshot {
            config,
            pid,
            pretty,
        } => {
            let cfg = Config::load_or_default(&config)?;
            print_snapshot(&cfg, pid, pretty)
        }

        Command::Run {
            config,
            duration,
            interval,
            pid,
            output_dir,
            no_load,
        } => {
            let mut cfg = Config::load_or_default(&config)?;

            // CLI overrides
            if let Some(d) = duration {
                cfg.sampling.duration_secs = d;
            }
            if let Some(i) = interval {
                cfg.sampling.interval_ms = i;
            }
            if let Some(p) = pid {
                cfg.sampling.pid = Some(p);
            }
            if no_load {
                cfg.load.enabled = false;
            }

            run_session(cfg, output_dir).await
        }
    }
}

/* ---------------- sampling run ---------------- */

async fn run_session(cfg: Config, output_dir: Option<PathBuf>) -> Result<()> {
    let validation = validate_config(&cfg);
    if !validation.is_valid() {
        for e in &validation.errors {
            eprintln!("✖ [{}] {}", e.code, e.message);
        }
        bail!("Invalid configuration");
    }

    let pid = cfg.sampling.pid.unwrap_or_else(std::process::id);
    let provider = SnapshotProvider::detect(&cfg.provider_settings());
    let output = match output_dir {
        Some(dir) => OutputLocator::exact(dir),
        None => OutputLocator::with_fallbacks(cfg.output.dir.clone()),
    };

    let mut sampler = Sampler::new(pid, provider, output, ConsoleSink::new());
    if let Some(load) = cfg.load_settings() {
        sampler = sampler.with_load(load);
    }

    if !sampler.start(cfg.run_settings()) {
        bail!("Failed to start sampling run");
    }

    let state = sampler.drive(ctrl_c()).await;

    if let Some(summary) = sampler.summary() {
        info!(
            run_id = %summary.run_id,
            status = ?summary.status,
            samples = summary.samples,
            peak_pss_kb = ?summary.peak_pss_kb,
            min_avail_mem_kb = ?summary.min_avail_mem_kb,
            saved = ?summary.saved_to(),
            "run summary"
        );
    }

    match sampler.last_save_result() {
        Some(SaveResult::Saved(path)) => {
            println!("{}", path.display());
            Ok(())
        }
        Some(SaveResult::Failed(e)) => bail!("Failed to save CSV: {}", e),
        None => bail!("Run ended without saving (state {:?})", state),
    }
}

/// Resolves on Ctrl-C; never resolves if the signal cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Ctrl-C handler unavailable, run will end when its duration elapses");
        std::future::pending::<()>().await;
    }
    eprintln!("Status: stopping...");
}

/* ---------------- snapshot ---------------- */

fn print_snapshot(cfg: &Config, pid: Option<u32>, pretty: bool) -> Result<()> {
    let settings = cfg.provider_settings();
    let pid = pid.or(cfg.sampling.pid).unwrap_or_else(std::process::id);

    let mut provider = SnapshotProvider::detect(&settings);
    let snapshot = provider.snapshot(pid);
    let status = ProcFsProvider::new(&settings.proc_root).read_status(pid);

    let out = serde_json::json!({
        "pid": pid,
        "strategy": provider.strategy(),
        "snapshot": snapshot,
        "status": status,
    });

    let rendered = if pretty {
        serde_json::to_string_pretty(&out)
    } else {
        serde_json::to_string(&out)
    }
    .context("Failed to format snapshot as JSON")?;

    println!("{}", rendered);
    Ok(())
}

/* ---------------- init ---------------- */

fn init_scaffold(path: &Path) -> Result<()> {
    if path.exists() {
        eprintln!("{} already exists (skipping)", path.display());
        return Ok(());
    }

    std::fs::write(path, default_config_yaml())
        .with_context(|| format!("Failed to write {:?}", path))?;
    eprintln!("Created {}", path.display());
    Ok(())
}

fn default_config_yaml() -> &'static str {
    r#"# memsampler configuration

sampling:
  duration_secs: 180
  interval_ms: 1000
  # pid: 1234          # defaults to memsampler itself

load:
  enabled: true
  buffer_kb: 256
  buffers_per_iteration: 6
  max_retained: 30
  release_count: 10
  compute_iterations: 100000
  pause_ms: 250
  join_timeout_ms: 1000

provider:
  prefer_platform: true
  low_memory_threshold_mb: 256
  proc_root: /proc

output:
  # unset or unusable: Downloads, then the user data dir, then cwd
  dir: null
"#
}
