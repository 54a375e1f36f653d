// src/sample.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::MemorySnapshot;

/// One timestamped observation of a process.
///
/// Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub pid: u32,
    pub pss_kb: i64,
    pub private_dirty_kb: i64,
    pub total_mem_kb: i64,
    pub avail_mem_kb: i64,
    pub low_memory: bool,
}

impl Sample {
    pub fn from_snapshot(timestamp: DateTime<Utc>, pid: u32, snapshot: MemorySnapshot) -> Self {
        Self {
            timestamp,
            pid,
            pss_kb: snapshot.pss_kb,
            private_dirty_kb: snapshot.private_dirty_kb,
            total_mem_kb: snapshot.total_mem_kb,
            avail_mem_kb: snapshot.avail_mem_kb,
            low_memory: snapshot.low_memory,
        }
    }
}

/// kB → MB for display. Unknown (negative) values stay unknown.
pub fn kb_to_mb(kb: i64) -> Option<f64> {
    (kb >= 0).then(|| kb as f64 / 1024.0)
}
