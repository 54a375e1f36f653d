// src/config.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::load::LoadProfile;
use crate::memory::ProviderSettings;
use crate::sampler::{LoadSettings, RunSettings};
use crate::util::read_to_string;

/// Root configuration loaded from `memsampler.yaml`.
///
/// Every section is optional; a missing file means all defaults.
/// CLI flags override individual values.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Run length, tick period and target pid
    #[serde(default)]
    pub sampling: Sampling,

    /// Synthetic load shape
    #[serde(default)]
    pub load: Load,

    /// Memory provider selection
    #[serde(default)]
    pub provider: Provider,

    /// Where CSV files go
    #[serde(default)]
    pub output: OutputConfig,
}

/// Sampling section.
///
/// Example:
///
/// sampling:
///   duration_secs: 180
///   interval_ms: 1000
#[derive(Debug, Deserialize)]
pub struct Sampling {
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Process to sample. Defaults to memsampler itself.
    #[serde(default)]
    pub pid: Option<u32>,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            duration_secs: default_duration_secs(),
            interval_ms: default_interval_ms(),
            pid: None,
        }
    }
}

fn default_duration_secs() -> u64 {
    180
}

fn default_interval_ms() -> u64 {
    1000
}

/// Synthetic load section.
#[derive(Debug, Deserialize)]
pub struct Load {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_buffer_kb")]
    pub buffer_kb: usize,

    #[serde(default = "default_buffers_per_iteration")]
    pub buffers_per_iteration: usize,

    #[serde(default = "default_max_retained")]
    pub max_retained: usize,

    #[serde(default = "default_release_count")]
    pub release_count: usize,

    #[serde(default = "default_compute_iterations")]
    pub compute_iterations: u64,

    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,

    #[serde(default = "default_join_timeout_ms")]
    pub join_timeout_ms: u64,
}

impl Default for Load {
    fn default() -> Self {
        Self {
            enabled: true,
            buffer_kb: default_buffer_kb(),
            buffers_per_iteration: default_buffers_per_iteration(),
            max_retained: default_max_retained(),
            release_count: default_release_count(),
            compute_iterations: default_compute_iterations(),
            pause_ms: default_pause_ms(),
            join_timeout_ms: default_join_timeout_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_buffer_kb() -> usize {
    256
}

fn default_buffers_per_iteration() -> usize {
    6
}

fn default_max_retained() -> usize {
    30
}

fn default_release_count() -> usize {
    10
}

fn default_compute_iterations() -> u64 {
    100_000
}

fn default_pause_ms() -> u64 {
    250
}

fn default_join_timeout_ms() -> u64 {
    1000
}

/// Provider section.
///
/// Example:
///
/// provider:
///   prefer_platform: true
///   low_memory_threshold_mb: 256
#[derive(Debug, Deserialize)]
pub struct Provider {
    #[serde(default = "default_true")]
    pub prefer_platform: bool,

    #[serde(default = "default_low_memory_threshold_mb")]
    pub low_memory_threshold_mb: u64,

    #[serde(default = "default_proc_root")]
    pub proc_root: PathBuf,
}

impl Default for Provider {
    fn default() -> Self {
        Self {
            prefer_platform: true,
            low_memory_threshold_mb: default_low_memory_threshold_mb(),
            proc_root: default_proc_root(),
        }
    }
}

fn default_low_memory_threshold_mb() -> u64 {
    256
}

fn default_proc_root() -> PathBuf {
    PathBuf::from("/proc")
}

/// Output section.
#[derive(Debug, Default, Deserialize)]
pub struct OutputConfig {
    /// Preferred output directory; platform fallbacks apply when unusable.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Load and parse a config file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Load `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        // An empty document is "all defaults", not an error.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).context("Failed to parse YAML config")
    }

    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            duration: Duration::from_secs(self.sampling.duration_secs),
            interval: Duration::from_millis(self.sampling.interval_ms),
        }
    }

    /// Load settings, or `None` when synthetic load is disabled.
    pub fn load_settings(&self) -> Option<LoadSettings> {
        if !self.load.enabled {
            return None;
        }

        Some(LoadSettings {
            profile: LoadProfile {
                buffer_kb: self.load.buffer_kb,
                buffers_per_iteration: self.load.buffers_per_iteration,
                max_retained: self.load.max_retained,
                release_count: self.load.release_count,
                compute_iterations: self.load.compute_iterations,
                pause: Duration::from_millis(self.load.pause_ms),
            },
            join_timeout: Duration::from_millis(self.load.join_timeout_ms),
        })
    }

    pub fn provider_settings(&self) -> ProviderSettings {
        let threshold_kb = self.provider.low_memory_threshold_mb.saturating_mul(1024);
        ProviderSettings {
            prefer_platform: self.provider.prefer_platform,
            low_memory_threshold_kb: i64::try_from(threshold_kb).unwrap_or(i64::MAX),
            proc_root: self.provider.proc_root.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        let cfg = Config::parse("").unwrap();

        assert_eq!(cfg.sampling.duration_secs, 180);
        assert_eq!(cfg.sampling.interval_ms, 1000);
        assert!(cfg.load.enabled);
        assert_eq!(cfg.load.pause_ms, 250);
        assert!(cfg.provider.prefer_platform);
        assert_eq!(cfg.provider.proc_root, PathBuf::from("/proc"));
        assert!(cfg.output.dir.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = Config::parse(
            "sampling:\n  duration_secs: 30\nload:\n  enabled: false\noutput:\n  dir: /tmp/out\n",
        )
        .unwrap();

        assert_eq!(cfg.sampling.duration_secs, 30);
        assert_eq!(cfg.sampling.interval_ms, 1000);
        assert!(cfg.load_settings().is_none());
        assert_eq!(cfg.output.dir, Some(PathBuf::from("/tmp/out")));
        assert_eq!(
            cfg.run_settings(),
            RunSettings {
                duration: Duration::from_secs(30),
                interval: Duration::from_secs(1),
            }
        );
    }

    #[test]
    fn load_settings_follow_config() {
        let cfg = Config::parse("load:\n  buffer_kb: 64\n  pause_ms: 100\n").unwrap();
        let load = cfg.load_settings().unwrap();

        assert_eq!(load.profile.buffer_kb, 64);
        assert_eq!(load.profile.pause, Duration::from_millis(100));
        assert_eq!(load.profile.buffers_per_iteration, 6);
        assert_eq!(load.join_timeout, Duration::from_secs(1));
    }

    #[test]
    fn threshold_is_converted_to_kb() {
        let cfg = Config::parse("provider:\n  low_memory_threshold_mb: 2\n").unwrap();
        assert_eq!(cfg.provider_settings().low_memory_threshold_kb, 2048);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        assert!(Config::parse("sampling: [").is_err());
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_or_default(&dir.path().join("memsampler.yaml")).unwrap();
        assert_eq!(cfg.sampling.duration_secs, 180);
    }
}
