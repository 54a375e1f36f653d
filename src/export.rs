// src/export.rs

//! CSV persistence of a run's samples.
//!
//! Output format:
//! - UTF-8, comma separated
//! - header `timestamp,pid,pss_kb,private_dirty_kb,total_mem_kb,avail_mem_kb,low_memory`
//! - one row per sample, unknown values written as `-1`
//!
//! Rows are written to a temporary file next to the target and renamed
//! into place only once everything is flushed, so a failed write never
//! leaves a file behind under the final name.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::run_id::RunId;
use crate::sample::Sample;

/// Column names, in output order.
pub const CSV_HEADER: [&str; 7] = [
    "timestamp",
    "pid",
    "pss_kb",
    "private_dirty_kb",
    "total_mem_kb",
    "avail_mem_kb",
    "low_memory",
];

/// File name for a run's CSV.
///
/// Example: `mem_samples_1760868000_1a2b3c4d.csv`
pub fn csv_file_name(run_id: &RunId, now: DateTime<Utc>) -> String {
    format!("mem_samples_{}_{}.csv", now.timestamp(), run_id.short())
}

/// Write `samples` to `path` and return the path on success.
pub fn write_csv(samples: &[Sample], path: &Path) -> Result<PathBuf> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {:?}", dir))?;

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(tmp);

    writer
        .write_record(CSV_HEADER)
        .context("Failed to write CSV header")?;

    for sample in samples {
        writer
            .serialize(sample)
            .context("Failed to write CSV row")?;
    }

    let tmp = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV data: {}", e.error()))?;

    tmp.as_file()
        .sync_all()
        .context("Failed to sync CSV file")?;

    tmp.persist(path)
        .with_context(|| format!("Failed to write CSV file {:?}", path))?;

    Ok(path.to_path_buf())
}
