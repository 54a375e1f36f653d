// src/sinks/collecting.rs

use crate::sampler::events::{SamplerEvent, SamplerEventKind};
use crate::sampler::sink::EventSink;

/// An in-memory event sink that keeps every event of a sampler's life.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Vec<SamplerEvent>,
}

impl CollectingEventSink {
    /// Create a new, empty collecting sink.
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Borrow all collected events.
    pub fn events(&self) -> &[SamplerEvent] {
        &self.events
    }

    /// Number of collected events matching `pred`.
    pub fn count(&self, pred: impl Fn(&SamplerEventKind) -> bool) -> usize {
        self.events.iter().filter(|e| pred(&e.kind)).count()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&mut self, event: SamplerEvent) {
        self.events.push(event);
    }
}
