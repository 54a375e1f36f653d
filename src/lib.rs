// src/lib.rs

//! Process memory sampling under synthetic load.
//!
//! Building blocks:
//! - [`memory`]: snapshot providers (platform API, `/proc` fallback)
//! - [`load`]: the synthetic load worker and its cancellation flag
//! - [`sampler`]: the run state machine and periodic ticker
//! - [`export`]: CSV persistence
//!
//! The CLI (`cli`, `runner`) is one collaborator of [`sampler::Sampler`];
//! anything that can call `start` / `stop` and implement
//! [`sampler::sink::EventSink`] can drive it.

pub mod cli;
pub mod config;
pub mod export;
pub mod load;
pub mod memory;
pub mod run_id;
pub mod runner;
pub mod sample;
pub mod sampler;
pub mod sinks;
pub mod util;
pub mod validate;
