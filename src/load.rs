// src/load.rs

//! Synthetic memory / CPU load.
//!
//! While a run is active a worker thread churns memory so the sampler has
//! a non-monotonic signal to observe. Each iteration:
//! - allocates a handful of fixed-size buffers and keeps them
//! - drops the oldest buffers once too many are retained
//! - runs a fixed amount of busy arithmetic
//! - sleeps for a short pause
//!
//! Allocation uses fallible reservation; a failed allocation clears the
//! retained buffers and the loop carries on.
//!
//! Stopping is cooperative: the worker polls a shared [`CancelFlag`] once
//! per iteration, so stop latency is at most one pause plus one compute
//! round.

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Shared stop signal between the sampler and the load worker.
///
/// Set-only: a run that needs a clear flag makes a new one.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Shape of the synthetic workload.
#[derive(Debug, Clone)]
pub struct LoadProfile {
    /// Size of each buffer in kB.
    pub buffer_kb: usize,

    /// Buffers allocated per iteration.
    pub buffers_per_iteration: usize,

    /// Retained buffer count above which old buffers are released.
    pub max_retained: usize,

    /// How many of the oldest buffers to release at once.
    pub release_count: usize,

    /// Busy-loop rounds per iteration.
    pub compute_iterations: u64,

    /// Sleep between iterations.
    pub pause: Duration,
}

impl Default for LoadProfile {
    fn default() -> Self {
        Self {
            buffer_kb: 256,
            buffers_per_iteration: 6,
            max_retained: 30,
            release_count: 10,
            compute_iterations: 100_000,
            pause: Duration::from_millis(250),
        }
    }
}

/// What the worker did, reported when it exits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub iterations: u64,
    pub peak_retained: usize,
    pub allocation_failures: u64,
    pub cancelled: bool,
}

/// Run the workload on the current thread until `duration` elapses or
/// `cancel` is set.
pub fn run(profile: &LoadProfile, cancel: &CancelFlag, duration: Duration) -> LoadReport {
    let started = Instant::now();
    let buffer_len = profile.buffer_kb.saturating_mul(1024);
    let mut retained: VecDeque<Vec<u8>> = VecDeque::new();
    let mut report = LoadReport::default();

    while started.elapsed() < duration && !cancel.is_set() {
        for _ in 0..profile.buffers_per_iteration {
            match allocate(buffer_len) {
                Some(buf) => retained.push_back(buf),
                None => {
                    report.allocation_failures += 1;
                    retained.clear();
                    break;
                }
            }
        }
        report.peak_retained = report.peak_retained.max(retained.len());

        if retained.len() > profile.max_retained {
            let n = profile.release_count.min(retained.len());
            retained.drain(..n);
        }

        busy_compute(profile.compute_iterations);
        report.iterations += 1;

        thread::sleep(profile.pause);
    }

    report.cancelled = cancel.is_set();
    drop(retained);
    report
}

/// Allocate and touch a buffer, or `None` if the allocator refuses.
fn allocate(len: usize) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).ok()?;
    // Touch every page so the buffer shows up in RSS.
    buf.resize(len, 0xA5);
    Some(buf)
}

/// Deterministic arithmetic; the result only exists to defeat the optimiser.
fn busy_compute(iterations: u64) -> u64 {
    let mut acc = 0u64;
    for i in 0..iterations {
        acc = acc.wrapping_add((i ^ (i << 1)) & 0xFF);
    }
    std::hint::black_box(acc)
}

/// Handle to a running load worker.
pub struct LoadWorker {
    handle: thread::JoinHandle<LoadReport>,
}

impl LoadWorker {
    /// Start the workload on a dedicated thread.
    pub fn spawn(profile: LoadProfile, cancel: CancelFlag, duration: Duration) -> Result<Self> {
        let handle = thread::Builder::new()
            .name("memsampler-load".to_string())
            .spawn(move || {
                debug!(?duration, "load worker started");
                let report = run(&profile, &cancel, duration);
                debug!(?report, "load worker exited");
                report
            })
            .context("Failed to spawn load worker thread")?;

        Ok(Self { handle })
    }

    /// Wait up to `timeout` for the worker to exit.
    ///
    /// Returns `None` if it did not finish in time (the thread is left to
    /// exit on its own) or if it panicked. Blocks the calling thread.
    pub fn join_timeout(self, timeout: Duration) -> Option<LoadReport> {
        let deadline = Instant::now() + timeout;

        while !self.handle.is_finished() {
            if Instant::now() >= deadline {
                warn!(?timeout, "load worker did not exit before the join deadline");
                return None;
            }
            thread::sleep(Duration::from_millis(5));
        }

        self.handle.join().ok()
    }
}
