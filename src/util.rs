// src/util.rs

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read a UTF-8 file into a String with a clear error message.
pub fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file {:?}", path))
}

/// Ensure a directory exists (create it if missing).
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory {:?}", path))
}

/// Whether a file can actually be created in `dir`.
fn is_writable_dir(dir: &Path) -> bool {
    tempfile::Builder::new()
        .prefix(".memsampler-probe")
        .tempfile_in(dir)
        .is_ok()
}

/// Decides where CSV files go.
///
/// Two modes:
/// - exact: only the given directory, failure is reported as-is
/// - fallback chain: configured dir → downloads → per-user data dir → cwd
///
/// Only the configured and per-user data dirs are created on demand; the
/// download dir and cwd are used when they already exist.
#[derive(Debug, Clone)]
pub struct OutputLocator {
    candidates: Vec<Candidate>,
    exact: bool,
}

#[derive(Debug, Clone)]
struct Candidate {
    dir: PathBuf,
    create: bool,
}

impl Candidate {
    fn usable(&self) -> bool {
        let present = if self.create {
            ensure_dir(&self.dir).is_ok()
        } else {
            self.dir.is_dir()
        };
        present && is_writable_dir(&self.dir)
    }
}

impl OutputLocator {
    /// Use `dir` and nothing else.
    pub fn exact(dir: impl Into<PathBuf>) -> Self {
        Self {
            candidates: vec![Candidate {
                dir: dir.into(),
                create: true,
            }],
            exact: true,
        }
    }

    /// Try `configured` first, then the platform fallbacks.
    pub fn with_fallbacks(configured: Option<PathBuf>) -> Self {
        let created = |dir| Candidate { dir, create: true };
        let existing = |dir| Candidate { dir, create: false };

        let mut candidates = Vec::new();
        candidates.extend(configured.map(created));
        candidates.extend(dirs::download_dir().map(existing));
        candidates.extend(dirs::data_local_dir().map(|d| created(d.join("memsampler"))));
        candidates.extend(std::env::current_dir().ok().map(existing));

        Self {
            candidates,
            exact: false,
        }
    }

    /// Resolve the directory to write into, creating it if needed.
    pub fn resolve_output_dir(&self) -> Result<PathBuf> {
        if self.exact {
            if let Some(c) = self.candidates.first() {
                ensure_dir(&c.dir)?;
                return Ok(c.dir.clone());
            }
        }

        for c in &self.candidates {
            if c.usable() {
                return Ok(c.dir.clone());
            }
            debug!(dir = %c.dir.display(), "output directory not usable, trying next");
        }

        let tried: Vec<&PathBuf> = self.candidates.iter().map(|c| &c.dir).collect();
        bail!("No writable output directory found (tried {:?})", tried)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_creates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("a/b");

        let resolved = OutputLocator::exact(&dir).resolve_output_dir().unwrap();

        assert_eq!(resolved, dir);
        assert!(dir.is_dir());
    }

    #[test]
    fn exact_reports_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        assert!(OutputLocator::exact(blocker.join("out")).resolve_output_dir().is_err());
    }

    #[test]
    fn fallback_skips_unusable_configured_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let bad = blocker.join("out");

        let resolved = OutputLocator::with_fallbacks(Some(bad.clone()))
            .resolve_output_dir()
            .unwrap();

        assert_ne!(resolved, bad);
    }

    #[test]
    fn fallback_prefers_configured_dir() {
        let tmp = tempfile::tempdir().unwrap();

        let resolved = OutputLocator::with_fallbacks(Some(tmp.path().to_path_buf()))
            .resolve_output_dir()
            .unwrap();

        assert_eq!(resolved, tmp.path());
    }
}
