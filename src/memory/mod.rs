// src/memory/mod.rs

//! Process memory snapshots.
//!
//! A snapshot answers five questions about a process and the system it
//! runs on:
//! - total system memory
//! - available system memory
//! - whether the system is in a low-memory condition
//! - the process's proportional set size (PSS)
//! - the process's private-dirty size
//!
//! Two strategies exist behind the [`MemoryProvider`] trait:
//! - [`platform::PlatformProvider`]: system totals via `sysinfo`, PSS and
//!   private-dirty via `smaps_rollup`
//! - [`procfs::ProcFsProvider`]: plain `/proc/meminfo` + `/proc/<pid>/status`
//!   parsing, with RSS standing in for PSS
//!
//! [`SnapshotProvider`] probes the platform strategy once and falls back to
//! procfs on every failed query. It never returns an error: fields that
//! cannot be determined are reported as [`UNKNOWN`].

pub mod platform;
pub mod procfs;

use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

use self::platform::PlatformProvider;
use self::procfs::ProcFsProvider;

/// Sentinel for a numeric field that could not be determined.
///
/// Consumers must treat it as "unknown", never as zero.
pub const UNKNOWN: i64 = -1;

/// One reading of system + process memory, all sizes in kB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemorySnapshot {
    pub total_mem_kb: i64,
    pub avail_mem_kb: i64,
    pub low_memory: bool,
    pub pss_kb: i64,
    pub private_dirty_kb: i64,
}

impl MemorySnapshot {
    /// A snapshot where nothing could be determined.
    pub fn unknown() -> Self {
        Self {
            total_mem_kb: UNKNOWN,
            avail_mem_kb: UNKNOWN,
            low_memory: false,
            pss_kb: UNKNOWN,
            private_dirty_kb: UNKNOWN,
        }
    }
}

/// A strategy for reading memory figures for a pid.
///
/// `query` may fail; the caller decides what to fall back to.
pub trait MemoryProvider {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn query(&mut self, pid: u32) -> Result<MemorySnapshot>;
}

/// Provider settings, resolved from config.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Try the platform strategy before procfs.
    pub prefer_platform: bool,

    /// Available memory below this is reported as a low-memory condition.
    pub low_memory_threshold_kb: i64,

    /// Root of the proc filesystem (normally `/proc`).
    pub proc_root: std::path::PathBuf,
}

/// Snapshot source used by the sampler.
///
/// Owns an optional primary strategy and the procfs fallback.
pub struct SnapshotProvider {
    primary: Option<Box<dyn MemoryProvider>>,
    fallback: ProcFsProvider,
}

impl SnapshotProvider {
    /// Probe capabilities once and build the provider.
    pub fn detect(settings: &ProviderSettings) -> Self {
        let fallback = ProcFsProvider::new(&settings.proc_root);

        let primary: Option<Box<dyn MemoryProvider>> = if settings.prefer_platform {
            PlatformProvider::probe(&settings.proc_root, settings.low_memory_threshold_kb)
                .map(|p| Box::new(p) as Box<dyn MemoryProvider>)
        } else {
            None
        };

        let provider = Self::with_primary(primary, fallback);
        debug!(strategy = provider.strategy(), "memory provider selected");
        provider
    }

    /// Assemble a provider from explicit parts.
    pub fn with_primary(primary: Option<Box<dyn MemoryProvider>>, fallback: ProcFsProvider) -> Self {
        Self { primary, fallback }
    }

    /// procfs only, rooted at `proc_root`.
    pub fn procfs_only(proc_root: &Path) -> Self {
        Self::with_primary(None, ProcFsProvider::new(proc_root))
    }

    /// Name of the strategy tried first.
    pub fn strategy(&self) -> &'static str {
        match &self.primary {
            Some(p) => p.name(),
            None => self.fallback.name(),
        }
    }

    /// Read memory figures for `pid`. Never fails.
    pub fn snapshot(&mut self, pid: u32) -> MemorySnapshot {
        if let Some(primary) = self.primary.as_mut() {
            match primary.query(pid) {
                Ok(snapshot) => return snapshot,
                Err(e) => {
                    debug!(
                        provider = primary.name(),
                        pid,
                        error = %format!("{:#}", e),
                        "primary memory query failed, falling back to procfs"
                    );
                }
            }
        }

        self.fallback
            .query(pid)
            .unwrap_or_else(|_| MemorySnapshot::unknown())
    }
}

/// Convert a byte count to whole kB, mapping zero to [`UNKNOWN`].
pub(crate) fn bytes_to_kb(bytes: u64) -> i64 {
    if bytes == 0 {
        return UNKNOWN;
    }
    i64::try_from(bytes / 1024).unwrap_or(UNKNOWN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::fs;

    struct Failing;

    impl MemoryProvider for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn query(&mut self, _pid: u32) -> Result<MemorySnapshot> {
            bail!("not available here")
        }
    }

    struct Fixed(MemorySnapshot);

    impl MemoryProvider for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn query(&mut self, _pid: u32) -> Result<MemorySnapshot> {
            Ok(self.0)
        }
    }

    fn proc_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("meminfo"),
            "MemTotal: 1000 kB\nMemFree: 100 kB\nMemAvailable: 400 kB\n",
        )
        .unwrap();
        fs::create_dir(dir.path().join("42")).unwrap();
        fs::write(
            dir.path().join("42/status"),
            "Name:\tdemo\nVmPeak:\t900 kB\nVmSize:\t800 kB\nVmRSS:\t300 kB\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn failing_primary_falls_back_to_procfs() {
        let root = proc_tree();
        let mut provider = SnapshotProvider::with_primary(
            Some(Box::new(Failing)),
            ProcFsProvider::new(root.path()),
        );

        let snap = provider.snapshot(42);

        assert_eq!(snap.total_mem_kb, 1000);
        assert_eq!(snap.avail_mem_kb, 400);
        assert_eq!(snap.pss_kb, 300);
        assert_eq!(snap.private_dirty_kb, UNKNOWN);
        assert!(!snap.low_memory);
    }

    #[test]
    fn successful_primary_wins() {
        let root = proc_tree();
        let expected = MemorySnapshot {
            total_mem_kb: 8,
            avail_mem_kb: 4,
            low_memory: true,
            pss_kb: 2,
            private_dirty_kb: 1,
        };
        let mut provider = SnapshotProvider::with_primary(
            Some(Box::new(Fixed(expected))),
            ProcFsProvider::new(root.path()),
        );

        assert_eq!(provider.snapshot(42), expected);
        assert_eq!(provider.strategy(), "fixed");
    }

    #[test]
    fn missing_proc_tree_yields_all_sentinels() {
        let root = tempfile::tempdir().unwrap();
        let mut provider = SnapshotProvider::procfs_only(&root.path().join("nope"));

        assert_eq!(provider.snapshot(u32::MAX), MemorySnapshot::unknown());
    }

    #[test]
    fn detected_provider_reports_every_field_for_any_pid() {
        let settings = ProviderSettings {
            prefer_platform: true,
            low_memory_threshold_kb: 256 * 1024,
            proc_root: "/proc".into(),
        };
        let mut provider = SnapshotProvider::detect(&settings);

        for pid in [std::process::id(), 0, u32::MAX] {
            let snap = provider.snapshot(pid);
            for value in [
                snap.total_mem_kb,
                snap.avail_mem_kb,
                snap.pss_kb,
                snap.private_dirty_kb,
            ] {
                assert!(value >= UNKNOWN, "unexpected value {value}");
            }
        }
    }

    #[test]
    fn zero_bytes_is_unknown() {
        assert_eq!(bytes_to_kb(0), UNKNOWN);
        assert_eq!(bytes_to_kb(4096), 4);
    }
}
