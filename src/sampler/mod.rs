// src/sampler/mod.rs

//! Periodic memory sampler.
//!
//! A [`Sampler`] owns one run at a time:
//!
//! ```text
//! Idle ──start──▶ Running ──stop──────▶ Stopped ──start──▶ Running …
//!                    └────duration────▶ Finished ─start──▶ Running …
//! ```
//!
//! Responsibilities:
//! - take one snapshot per tick and append it to the run's samples
//! - start and signal the load worker
//! - write the CSV exactly once when a run ends
//! - report everything to an [`EventSink`]
//!
//! Ticks, samples and all observer-visible state live on the task that
//! calls [`Sampler::drive`]. The only state shared with the load worker is
//! its [`CancelFlag`], and every run gets a fresh one: a worker that
//! outlives its join deadline still sees its own flag set after a restart.
//!
//! Ending a run only signals the worker. `drive` waits for it on the
//! blocking pool, so the ticking task is never held up by the join.

pub mod events;
pub mod sink;
pub mod summary;

use chrono::Utc;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::export::{csv_file_name, write_csv};
use crate::load::{CancelFlag, LoadProfile, LoadWorker};
use crate::memory::SnapshotProvider;
use crate::run_id::RunId;
use crate::sample::Sample;
use crate::util::OutputLocator;

use self::events::{event, SamplerEventKind};
use self::sink::EventSink;
use self::summary::RunSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Stopped,
    Finished,
}

/// Length and tick period of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    pub duration: Duration,
    pub interval: Duration,
}

/// Outcome of the CSV write at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveResult {
    Saved(PathBuf),
    Failed(String),
}

/// Synthetic load attached to each run.
#[derive(Debug, Clone)]
pub struct LoadSettings {
    pub profile: LoadProfile,

    /// How long `stop` waits for the worker to exit.
    pub join_timeout: Duration,
}

pub struct Sampler<S: EventSink> {
    pid: u32,
    provider: SnapshotProvider,
    output: OutputLocator,
    load: Option<LoadSettings>,
    sink: S,

    state: RunState,
    run_id: Option<RunId>,
    settings: Option<RunSettings>,
    samples: Vec<Sample>,
    cancel: CancelFlag,
    worker: Option<LoadWorker>,
    ticker: Option<Interval>,
    started_at: Option<Instant>,
    last_save: Option<SaveResult>,
}

impl<S: EventSink> Sampler<S> {
    pub fn new(pid: u32, provider: SnapshotProvider, output: OutputLocator, sink: S) -> Self {
        Self {
            pid,
            provider,
            output,
            load: None,
            sink,
            state: RunState::Idle,
            run_id: None,
            settings: None,
            samples: Vec::new(),
            cancel: CancelFlag::new(),
            worker: None,
            ticker: None,
            started_at: None,
            last_save: None,
        }
    }

    /// Run a load worker alongside every run.
    pub fn with_load(mut self, load: LoadSettings) -> Self {
        self.load = Some(load);
        self
    }

    /* ---------------- control surface ---------------- */

    /// Begin a run. Returns `false` (and changes nothing) if a run is
    /// already active or the interval is zero.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self, settings: RunSettings) -> bool {
        if self.state == RunState::Running {
            debug!("start ignored, run already active");
            return false;
        }
        if settings.interval.is_zero() {
            warn!("start ignored, sampling interval is zero");
            return false;
        }

        let run_id = RunId::new();

        if self.worker.take().is_some() {
            debug!("previous load worker was never joined, detaching it");
        }

        self.samples.clear();
        self.last_save = None;
        self.cancel = CancelFlag::new();
        self.run_id = Some(run_id);
        self.settings = Some(settings);

        if let Some(load) = &self.load {
            match LoadWorker::spawn(load.profile.clone(), self.cancel.clone(), settings.duration) {
                Ok(worker) => self.worker = Some(worker),
                Err(e) => warn!(error = %format!("{:#}", e), "running without synthetic load"),
            }
        }

        let mut ticker = tokio::time::interval(settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.ticker = Some(ticker);
        self.started_at = Some(Instant::now());
        self.state = RunState::Running;

        info!(
            %run_id,
            pid = self.pid,
            strategy = self.provider.strategy(),
            duration_secs = settings.duration.as_secs_f64(),
            interval_ms = settings.interval.as_millis() as u64,
            "run started"
        );
        self.emit(SamplerEventKind::RunStarted {
            pid: self.pid,
            duration: settings.duration,
            interval: settings.interval,
        });

        true
    }

    /// End the active run early. Returns `false` if no run is active.
    pub fn stop(&mut self) -> bool {
        if self.state != RunState::Running {
            return false;
        }
        self.end_run(RunState::Stopped);
        true
    }

    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn run_id(&self) -> Option<RunId> {
        self.run_id
    }

    pub fn latest_sample(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn last_save_result(&self) -> Option<&SaveResult> {
        self.last_save.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Summary of the current or most recent run.
    pub fn summary(&self) -> Option<RunSummary> {
        let run_id = self.run_id?;
        Some(RunSummary::new(
            run_id,
            self.state,
            &self.samples,
            self.last_save.clone(),
        ))
    }

    /* ---------------- scheduling ---------------- */

    /// Tick until the active run ends, then wait for its load worker.
    ///
    /// If `stop_signal` resolves first the run is stopped. Returns the
    /// final state (`Idle` if no run was active).
    pub async fn drive<F>(&mut self, stop_signal: F) -> RunState
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(stop_signal);

        while self.is_running() {
            tokio::select! {
                biased;

                _ = &mut stop_signal => {
                    self.stop();
                }
                _ = self.next_tick() => {
                    self.tick();
                }
            }
        }

        self.join_worker().await;
        self.state
    }

    async fn next_tick(&mut self) {
        match self.ticker.as_mut() {
            Some(ticker) => {
                ticker.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }

    /// Take one sample and end the run if its duration has elapsed.
    ///
    /// Does nothing unless a run is active.
    pub fn tick(&mut self) {
        if self.state != RunState::Running {
            return;
        }

        let snapshot = self.provider.snapshot(self.pid);

        // Wall clock may step backwards; keep the sequence ordered.
        let mut timestamp = Utc::now();
        if let Some(last) = self.samples.last() {
            if timestamp < last.timestamp {
                timestamp = last.timestamp;
            }
        }

        let sample = Sample::from_snapshot(timestamp, self.pid, snapshot);
        debug!(
            pss_kb = sample.pss_kb,
            avail_mem_kb = sample.avail_mem_kb,
            low_memory = sample.low_memory,
            n = self.samples.len() + 1,
            "sample taken"
        );
        self.samples.push(sample.clone());
        self.emit(SamplerEventKind::SampleTaken(sample));

        let elapsed = self.started_at.map(|t| t.elapsed()).unwrap_or_default();
        let duration = self.settings.map(|s| s.duration).unwrap_or_default();
        if elapsed >= duration {
            self.end_run(RunState::Finished);
        }
    }

    /* ---------------- run end ---------------- */

    fn end_run(&mut self, state: RunState) {
        self.cancel.set();
        self.ticker = None;
        self.state = state;

        info!(
            run_id = %self.run_id_display(),
            status = ?state,
            samples = self.samples.len(),
            "run ended"
        );
        self.emit(match state {
            RunState::Finished => SamplerEventKind::RunFinished,
            _ => SamplerEventKind::RunStopped,
        });

        match self.output.resolve_output_dir() {
            Ok(dir) => self.write_into(&dir),
            Err(e) => self.record_save(Err(e)),
        };
    }

    /// Write the finished run's samples into `dir`, e.g. after a failed save.
    ///
    /// Returns `None` while a run is active or before any run.
    pub fn save_to(&mut self, dir: &Path) -> Option<SaveResult> {
        if self.state == RunState::Running || self.run_id.is_none() {
            return None;
        }
        let result = OutputLocator::exact(dir)
            .resolve_output_dir()
            .map(|dir| self.write_into(&dir));

        match result {
            Ok(r) => Some(r),
            Err(e) => Some(self.record_save(Err(e))),
        }
    }

    fn write_into(&mut self, dir: &Path) -> SaveResult {
        let run_id = self.run_id.unwrap_or_else(RunId::new);
        let path = dir.join(csv_file_name(&run_id, Utc::now()));
        let result = write_csv(&self.samples, &path);
        self.record_save(result)
    }

    fn record_save(&mut self, result: anyhow::Result<PathBuf>) -> SaveResult {
        let saved = match result {
            Ok(path) => {
                info!(
                    run_id = %self.run_id_display(),
                    path = %path.display(),
                    samples = self.samples.len(),
                    "samples saved"
                );
                self.emit(SamplerEventKind::CsvSaved(path.clone()));
                SaveResult::Saved(path)
            }
            Err(e) => {
                let message = format!("{:#}", e);
                error!(run_id = %self.run_id_display(), error = %message, "failed to save samples");
                self.emit(SamplerEventKind::CsvFailed(message.clone()));
                SaveResult::Failed(message)
            }
        };

        self.last_save = Some(saved.clone());
        saved
    }

    /// Wait for a signalled load worker, off the current thread.
    async fn join_worker(&mut self) {
        let (Some(worker), Some(load)) = (self.worker.take(), self.load.as_ref()) else {
            return;
        };

        let timeout = load.join_timeout;
        match tokio::task::spawn_blocking(move || worker.join_timeout(timeout)).await {
            Ok(Some(report)) => debug!(
                iterations = report.iterations,
                peak_retained = report.peak_retained,
                allocation_failures = report.allocation_failures,
                cancelled = report.cancelled,
                "load worker joined"
            ),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "load worker join task failed"),
        }
    }

    fn emit(&mut self, kind: SamplerEventKind) {
        if let Some(run_id) = self.run_id {
            self.sink.emit(event(run_id, kind));
        }
    }

    fn run_id_display(&self) -> String {
        self.run_id.map(|id| id.to_string()).unwrap_or_default()
    }
}

impl<S: EventSink> Drop for Sampler<S> {
    fn drop(&mut self) {
        self.cancel.set();
    }
}
