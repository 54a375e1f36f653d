// src/sampler/sink.rs

use crate::sampler::events::SamplerEvent;

/// Observer of sampler lifecycle and samples.
pub trait EventSink {
    fn emit(&mut self, event: SamplerEvent);
}
