//! Offline sample playback, pitch shifting and synthesis.
//!
//! Everything here is deterministic: the same haps, samples and config
//! always produce the same PCM.

pub mod bank;
pub mod engine;
pub mod envelope;
pub mod filter;
pub mod mixer;
pub mod oscillator;
pub mod pitch_shift;
pub mod renderer;
pub mod resample;
pub mod sampler;
pub mod voice;
pub mod wsola;
