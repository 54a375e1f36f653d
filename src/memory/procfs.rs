// src/memory/procfs.rs

//! `/proc` text parsing.
//!
//! Both `/proc/meminfo` and `/proc/<pid>/status` use the same
//! `Label:   value unit` line shape. Parsing is best-effort:
//! - a missing or unreadable file yields an empty table
//! - a malformed line is skipped on its own
//!
//! Without the platform strategy there is no PSS, so `VmRSS` is used as a
//! stand-in, private-dirty is unknown and the low-memory flag is `false`.

use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{MemoryProvider, MemorySnapshot, UNKNOWN};

/// Parse `Label: value [unit]` lines into a label → value table.
///
/// Lines without a colon, with whitespace inside the label, or whose first
/// value token is not a non-negative integer are skipped.
pub fn parse_kb_table(text: &str) -> BTreeMap<String, i64> {
    let mut table = BTreeMap::new();

    for line in text.lines() {
        let Some((label, rest)) = line.split_once(':') else {
            continue;
        };

        let label = label.trim();
        if label.is_empty() || label.contains(char::is_whitespace) {
            continue;
        }

        let Some(value) = rest.split_whitespace().next() else {
            continue;
        };

        let Some(v) = value.parse::<u64>().ok().and_then(|v| i64::try_from(v).ok()) else {
            continue;
        };
        table.insert(label.to_string(), v);
    }

    table
}

/// The `Vm*` sizes of a process status file, in kB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessStatus {
    pub vm_rss_kb: i64,
    pub vm_size_kb: i64,
    pub vm_peak_kb: i64,
}

impl ProcessStatus {
    pub fn from_table(table: &BTreeMap<String, i64>) -> Self {
        let get = |k: &str| table.get(k).copied().unwrap_or(UNKNOWN);
        Self {
            vm_rss_kb: get("VmRSS"),
            vm_size_kb: get("VmSize"),
            vm_peak_kb: get("VmPeak"),
        }
    }
}

/// Build a snapshot from parsed `meminfo` and process status tables.
pub fn snapshot_from_tables(
    meminfo: &BTreeMap<String, i64>,
    status: &ProcessStatus,
) -> MemorySnapshot {
    let (total_mem_kb, avail_mem_kb) = system_totals(meminfo);

    MemorySnapshot {
        total_mem_kb,
        avail_mem_kb,
        low_memory: false,
        pss_kb: status.vm_rss_kb,
        private_dirty_kb: UNKNOWN,
    }
}

/// `(MemTotal, MemAvailable)` from a `meminfo` table, with `MemFree`
/// standing in for a missing `MemAvailable`.
pub fn system_totals(meminfo: &BTreeMap<String, i64>) -> (i64, i64) {
    let total_mem_kb = meminfo.get("MemTotal").copied().unwrap_or(UNKNOWN);
    let avail_mem_kb = meminfo
        .get("MemAvailable")
        .or_else(|| meminfo.get("MemFree"))
        .copied()
        .unwrap_or(UNKNOWN);
    (total_mem_kb, avail_mem_kb)
}

/// procfs-backed memory provider.
#[derive(Debug, Clone)]
pub struct ProcFsProvider {
    root: PathBuf,
}

impl ProcFsProvider {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// System-wide memory table (`<root>/meminfo`).
    pub fn read_meminfo(&self) -> BTreeMap<String, i64> {
        read_table(&self.root.join("meminfo"))
    }

    /// Process status sizes (`<root>/<pid>/status`).
    pub fn read_status(&self, pid: u32) -> ProcessStatus {
        let table = read_table(&self.root.join(pid.to_string()).join("status"));
        ProcessStatus::from_table(&table)
    }
}

impl MemoryProvider for ProcFsProvider {
    fn name(&self) -> &'static str {
        "procfs"
    }

    fn query(&mut self, pid: u32) -> Result<MemorySnapshot> {
        Ok(snapshot_from_tables(&self.read_meminfo(), &self.read_status(pid)))
    }
}

/// Read and parse a table file; a missing file is an empty table.
pub(crate) fn read_table(path: &Path) -> BTreeMap<String, i64> {
    match fs::read_to_string(path) {
        Ok(text) => parse_kb_table(&text),
        Err(_) => BTreeMap::new(),
    }
}
