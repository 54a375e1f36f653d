// src/validate.rs

//! Configuration checks run before a sampling run starts.
//!
//! All problems are collected and reported together, each with a stable
//! code, rather than failing on the first one.

use crate::config::Config;

#[derive(Debug)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

#[derive(Debug)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn push_error(&mut self, code: &'static str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            code,
            message: message.into(),
        });
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn validate_config(cfg: &Config) -> ValidationResult {
    let mut result = ValidationResult::ok();

    validate_sampling(cfg, &mut result);
    validate_load(cfg, &mut result);

    result
}

/* ---------------- sampling ---------------- */

fn validate_sampling(cfg: &Config, result: &mut ValidationResult) {
    if cfg.sampling.duration_secs == 0 {
        result.push_error(
            "SAMPLING_DURATION_INVALID",
            "duration_secs must be greater than zero",
        );
    }

    if cfg.sampling.interval_ms == 0 {
        result.push_error(
            "SAMPLING_INTERVAL_INVALID",
            "interval_ms must be greater than zero",
        );
    } else if cfg.sampling.interval_ms > cfg.sampling.duration_secs.saturating_mul(1000) {
        result.push_error(
            "SAMPLING_INTERVAL_TOO_LONG",
            "interval_ms must not exceed the run duration",
        );
    }
}

/* ---------------- load ---------------- */

fn validate_load(cfg: &Config, result: &mut ValidationResult) {
    let load = &cfg.load;
    if !load.enabled {
        return;
    }

    if load.buffer_kb == 0 || load.buffers_per_iteration == 0 {
        result.push_error(
            "LOAD_BUFFER_INVALID",
            "buffer_kb and buffers_per_iteration must be greater than zero",
        );
    }

    if load.release_count < load.buffers_per_iteration {
        result.push_error(
            "LOAD_RELEASE_INVALID",
            format!(
                "release_count ({}) must be at least buffers_per_iteration ({}) to keep retention bounded",
                load.release_count, load.buffers_per_iteration
            ),
        );
    }

    if load.pause_ms == 0 {
        result.push_error("LOAD_PAUSE_INVALID", "pause_ms must be greater than zero");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(yaml: &str) -> Vec<&'static str> {
        let cfg = Config::parse(yaml).unwrap();
        validate_config(&cfg).errors.iter().map(|e| e.code).collect()
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&Config::default()).is_valid());
    }

    #[test]
    fn zero_duration_and_interval_are_reported_together() {
        assert_eq!(
            codes("sampling:\n  duration_secs: 0\n  interval_ms: 0\n"),
            ["SAMPLING_DURATION_INVALID", "SAMPLING_INTERVAL_INVALID"]
        );
    }

    #[test]
    fn interval_longer_than_run() {
        assert_eq!(
            codes("sampling:\n  duration_secs: 1\n  interval_ms: 5000\n"),
            ["SAMPLING_INTERVAL_TOO_LONG"]
        );
    }

    #[test]
    fn unbounded_retention_is_rejected() {
        assert_eq!(
            codes("load:\n  buffers_per_iteration: 8\n  release_count: 4\n"),
            ["LOAD_RELEASE_INVALID"]
        );
    }

    #[test]
    fn disabled_load_is_not_checked() {
        assert!(codes("load:\n  enabled: false\n  pause_ms: 0\n  buffer_kb: 0\n").is_empty());
    }

    #[test]
    fn zero_pause_and_buffer() {
        assert_eq!(
            codes("load:\n  pause_ms: 0\n  buffer_kb: 0\n"),
            ["LOAD_BUFFER_INVALID", "LOAD_PAUSE_INVALID"]
        );
    }
}
