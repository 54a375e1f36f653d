// src/sinks/console.rs

//! Terminal view of a run.
//!
//! - one line per sample on stdout: `[ts] PSS=… MB, Avail=… MB, Low=…`
//! - lifecycle and save status on stderr
//!
//! Colour is used only on a terminal and when `NO_COLOR` is unset.

use chrono::{DateTime, SecondsFormat, Utc};
use std::io::IsTerminal;

use crate::sample::{kb_to_mb, Sample};
use crate::sampler::events::{SamplerEvent, SamplerEventKind};
use crate::sampler::sink::EventSink;

pub struct ConsoleSink {
    use_color: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self {
            use_color: should_use_color(),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for ConsoleSink {
    fn emit(&mut self, event: SamplerEvent) {
        match &event.kind {
            SamplerEventKind::RunStarted {
                pid,
                duration,
                interval,
            } => {
                let at = DateTime::<Utc>::from(event.timestamp);
                eprintln!(
                    "Starting {}s memory test of pid {} ({}ms interval) at {} [{}]",
                    duration.as_secs(),
                    pid,
                    interval.as_millis(),
                    at.to_rfc3339_opts(SecondsFormat::Secs, true),
                    event.run_id
                );
            }
            SamplerEventKind::SampleTaken(sample) => {
                println!("{}", format_sample_line(sample, self.use_color));
            }
            SamplerEventKind::RunStopped => eprintln!("Status: stopped"),
            SamplerEventKind::RunFinished => eprintln!("Status: finished"),
            SamplerEventKind::CsvSaved(path) => {
                eprintln!("{}", paint(&format!("Saved CSV: {}", path.display()), "32", self.use_color));
            }
            SamplerEventKind::CsvFailed(error) => {
                eprintln!("{}", paint(&format!("Failed to save CSV: {}", error), "31", self.use_color));
            }
        }
    }
}

/// Render a sample the way the live view shows it.
pub fn format_sample_line(sample: &Sample, use_color: bool) -> String {
    let low = if sample.low_memory {
        paint("true", "31", use_color)
    } else {
        "false".to_string()
    };

    format!(
        "[{}] PSS={}, Avail={}, Low={}",
        sample.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        format_mb(sample.pss_kb),
        format_mb(sample.avail_mem_kb),
        low
    )
}

fn format_mb(kb: i64) -> String {
    match kb_to_mb(kb) {
        Some(mb) => format!("{:.2} MB", mb),
        None => "n/a".to_string(),
    }
}

fn should_use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    std::io::stdout().is_terminal()
}

fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("\x1b[{}m{}\x1b[0m", color, text)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::UNKNOWN;
    use chrono::TimeZone;

    #[test]
    fn sample_line_shows_mb_and_unknown() {
        let sample = Sample {
            timestamp: Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
            pid: 1,
            pss_kb: 2048,
            private_dirty_kb: UNKNOWN,
            total_mem_kb: UNKNOWN,
            avail_mem_kb: UNKNOWN,
            low_memory: true,
        };

        assert_eq!(
            format_sample_line(&sample, false),
            "[2026-10-19T12:00:00.000Z] PSS=2.00 MB, Avail=n/a, Low=true"
        );
    }
}
