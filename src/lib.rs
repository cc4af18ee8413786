//! Offline renderer for scheduled music events.
//!
//! A [`HapSource`] supplies haps window by window; the [`Renderer`] mixes
//! them from sample banks and oscillators into normalized 16-bit stereo
//! WAV audio.
//!
//! ```no_run
//! use haprender_core::{BankTable, RenderConfig, Renderer, ScriptedHaps};
//! use std::path::Path;
//!
//! # fn main() -> haprender_core::Result<()> {
//! let haps = ScriptedHaps::load(Path::new("song.json"))?;
//! let banks = BankTable::load(Path::new("samples"))?;
//! let mut renderer = Renderer::new(banks, RenderConfig::default())?;
//! renderer.render_to_file(&haps, Path::new("song.wav"))?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dsp;
pub mod error;
pub mod hap;
pub mod note;

pub use config::RenderConfig;
pub use dsp::bank::{BankTable, SampleBank};
pub use dsp::engine::{AudioEngine, WindowStats};
pub use dsp::pitch_shift::{PercussionVocabulary, PitchShifter, ShiftMode, ShiftModeClassifier};
pub use dsp::renderer::{RenderOutput, RenderStats, Renderer, encode_wav};
pub use dsp::sampler::SampleBuffer;
pub use error::{RenderError, Result};
pub use hap::{Hap, HapSource, HapValue, ScriptedHaps, TimeSpan};

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
