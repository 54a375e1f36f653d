// src/memory/platform.rs

//! Platform memory strategy.
//!
//! - System total / available memory come from `sysinfo`, or from
//!   `<root>/meminfo` when a root other than `/proc` is configured, so both
//!   halves of a row describe the same tree.
//! - Process PSS and private-dirty come from `/proc/<pid>/smaps_rollup`,
//!   which is only readable where the kernel exposes it and the caller is
//!   allowed to inspect the target process.
//! - The low-memory flag is raised when available memory drops below the
//!   configured threshold.
//!
//! A query fails as a whole when `smaps_rollup` is unreadable or has no
//! `Pss` line; the snapshot provider then falls back to procfs.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use sysinfo::System;

use super::procfs::{parse_kb_table, read_table, system_totals};
use super::{bytes_to_kb, MemoryProvider, MemorySnapshot, UNKNOWN};

/// PSS and private-dirty of one process, in kB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rollup {
    pub pss_kb: i64,
    pub private_dirty_kb: i64,
}

/// Parse the contents of `smaps_rollup`.
///
/// Returns `None` when there is no `Pss` line. A missing `Private_Dirty`
/// line is reported as [`UNKNOWN`].
pub fn parse_smaps_rollup(text: &str) -> Option<Rollup> {
    let table = parse_kb_table(text);
    let pss_kb = *table.get("Pss")?;
    let private_dirty_kb = table.get("Private_Dirty").copied().unwrap_or(UNKNOWN);

    Some(Rollup {
        pss_kb,
        private_dirty_kb,
    })
}

/// Whether `available` is below a positive `threshold`. Unknown is never low.
pub fn is_low_memory(avail_mem_kb: i64, threshold_kb: i64) -> bool {
    avail_mem_kb != UNKNOWN && threshold_kb > 0 && avail_mem_kb < threshold_kb
}

const SYSTEM_PROC_ROOT: &str = "/proc";

pub struct PlatformProvider {
    system: System,
    proc_root: PathBuf,
    low_memory_threshold_kb: i64,
}

impl PlatformProvider {
    /// Probe once whether this strategy works for the current process.
    pub fn probe(proc_root: &Path, low_memory_threshold_kb: i64) -> Option<Self> {
        let own = rollup_path(proc_root, std::process::id());
        let text = fs::read_to_string(own).ok()?;
        parse_smaps_rollup(&text)?;

        Some(Self {
            system: System::new(),
            proc_root: proc_root.to_path_buf(),
            low_memory_threshold_kb,
        })
    }

    /// System `(total, available)` in kB.
    fn totals(&mut self) -> (i64, i64) {
        if self.proc_root != Path::new(SYSTEM_PROC_ROOT) {
            return system_totals(&read_table(&self.proc_root.join("meminfo")));
        }

        self.system.refresh_memory();
        let total_mem_kb = bytes_to_kb(self.system.total_memory());
        let avail_mem_kb = if total_mem_kb == UNKNOWN {
            UNKNOWN
        } else {
            i64::try_from(self.system.available_memory() / 1024).unwrap_or(UNKNOWN)
        };
        (total_mem_kb, avail_mem_kb)
    }
}

impl MemoryProvider for PlatformProvider {
    fn name(&self) -> &'static str {
        "platform"
    }

    fn query(&mut self, pid: u32) -> Result<MemorySnapshot> {
        let path = rollup_path(&self.proc_root, pid);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {:?}", path))?;
        let rollup = parse_smaps_rollup(&text)
            .with_context(|| format!("No Pss line in {:?}", path))?;

        let (total_mem_kb, avail_mem_kb) = self.totals();

        Ok(MemorySnapshot {
            total_mem_kb,
            avail_mem_kb,
            low_memory: is_low_memory(avail_mem_kb, self.low_memory_threshold_kb),
            pss_kb: rollup.pss_kb,
            private_dirty_kb: rollup.private_dirty_kb,
        })
    }
}

fn rollup_path(proc_root: &Path, pid: u32) -> PathBuf {
    proc_root.join(pid.to_string()).join("smaps_rollup")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLLUP: &str = "\
55d0c0a4b000-7ffd5a1f0000 ---p 00000000 00:00 0                          [rollup]
Rss:                4096 kB
Pss:                2048 kB
Pss_Anon:           1024 kB
Shared_Clean:       1536 kB
Private_Clean:       256 kB
Private_Dirty:       768 kB
Swap:                  0 kB
";

    #[test]
    fn rollup_reads_pss_and_private_dirty() {
        let rollup = parse_smaps_rollup(ROLLUP).unwrap();

        assert_eq!(
            rollup,
            Rollup {
                pss_kb: 2048,
                private_dirty_kb: 768,
            }
        );
    }

    #[test]
    fn rollup_without_pss_is_rejected() {
        assert!(parse_smaps_rollup("Rss: 10 kB\nPrivate_Dirty: 3 kB\n").is_none());
        assert!(parse_smaps_rollup("").is_none());
    }

    #[test]
    fn rollup_without_private_dirty_is_unknown() {
        let rollup = parse_smaps_rollup("Pss: 10 kB\n").unwrap();
        assert_eq!(rollup.private_dirty_kb, UNKNOWN);
    }

    #[test]
    fn low_memory_threshold() {
        assert!(is_low_memory(100, 200));
        assert!(!is_low_memory(300, 200));
        assert!(!is_low_memory(UNKNOWN, 200));
        assert!(!is_low_memory(100, 0));
    }

    #[test]
    fn query_reads_rollup_under_custom_root() {
        let root = tempfile::tempdir().unwrap();
        let pid = std::process::id();
        fs::create_dir(root.path().join(pid.to_string())).unwrap();
        fs::write(rollup_path(root.path(), pid), ROLLUP).unwrap();

        let mut provider = PlatformProvider::probe(root.path(), 0).unwrap();
        let snap = provider.query(pid).unwrap();

        assert_eq!(snap.pss_kb, 2048);
        assert_eq!(snap.private_dirty_kb, 768);
        assert!(!snap.low_memory);
        assert!(provider.query(pid + 1).is_err());
    }

    #[test]
    fn custom_root_takes_totals_from_its_meminfo() {
        let root = tempfile::tempdir().unwrap();
        let pid = std::process::id();
        fs::create_dir(root.path().join(pid.to_string())).unwrap();
        fs::write(rollup_path(root.path(), pid), ROLLUP).unwrap();
        fs::write(
            root.path().join("meminfo"),
            "MemTotal: 4000 kB\nMemAvailable: 100 kB\n",
        )
        .unwrap();

        let mut provider = PlatformProvider::probe(root.path(), 200).unwrap();
        let snap = provider.query(pid).unwrap();

        assert_eq!(snap.total_mem_kb, 4000);
        assert_eq!(snap.avail_mem_kb, 100);
        assert!(snap.low_memory);
    }

    #[test]
    fn custom_root_without_meminfo_has_unknown_totals() {
        let root = tempfile::tempdir().unwrap();
        let pid = std::process::id();
        fs::create_dir(root.path().join(pid.to_string())).unwrap();
        fs::write(rollup_path(root.path(), pid), ROLLUP).unwrap();

        let mut provider = PlatformProvider::probe(root.path(), 200).unwrap();
        let snap = provider.query(pid).unwrap();

        assert_eq!(snap.total_mem_kb, UNKNOWN);
        assert_eq!(snap.avail_mem_kb, UNKNOWN);
        assert!(!snap.low_memory);
    }

    #[test]
    fn probe_fails_without_rollup() {
        let root = tempfile::tempdir().unwrap();
        assert!(PlatformProvider::probe(root.path(), 0).is_none());
    }
}
