// src/sampler/summary.rs

use std::path::Path;

use crate::run_id::RunId;
use crate::sample::Sample;
use crate::sampler::{RunState, SaveResult};

/// End-of-run report. Extremes skip unknown values.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: RunId,
    pub status: RunState,
    pub samples: usize,
    pub peak_pss_kb: Option<i64>,
    pub min_avail_mem_kb: Option<i64>,
    pub saved: Option<SaveResult>,
}

impl RunSummary {
    pub fn new(
        run_id: RunId,
        status: RunState,
        samples: &[Sample],
        saved: Option<SaveResult>,
    ) -> Self {
        Self {
            run_id,
            status,
            samples: samples.len(),
            peak_pss_kb: samples.iter().map(|s| s.pss_kb).filter(|v| *v >= 0).max(),
            min_avail_mem_kb: samples
                .iter()
                .map(|s| s.avail_mem_kb)
                .filter(|v| *v >= 0)
                .min(),
            saved,
        }
    }

    /// Where the run's CSV ended up, if the save succeeded.
    pub fn saved_to(&self) -> Option<&Path> {
        match &self.saved {
            Some(SaveResult::Saved(path)) => Some(path),
            _ => None,
        }
    }
}
