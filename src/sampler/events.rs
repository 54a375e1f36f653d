// src/sampler/events.rs

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use crate::run_id::RunId;
use crate::sample::Sample;

#[derive(Debug, Clone, PartialEq)]
pub enum SamplerEventKind {
    RunStarted {
        pid: u32,
        duration: Duration,
        interval: Duration,
    },
    SampleTaken(Sample),
    RunStopped,
    RunFinished,
    CsvSaved(PathBuf),
    CsvFailed(String),
}

#[derive(Debug, Clone)]
pub struct SamplerEvent {
    pub run_id: RunId,
    pub kind: SamplerEventKind,
    pub timestamp: SystemTime,
}

pub fn event(run_id: RunId, kind: SamplerEventKind) -> SamplerEvent {
    SamplerEvent {
        run_id,
        kind,
        timestamp: SystemTime::now(),
    }
}
