//! Render configuration.
//!
//! Every field has a default, so a JSON config file only needs to name the
//! values it changes:
//!
//! ```json
//! { "sample_rate": 48000, "cps": 0.75, "total_cycles": 16 }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dsp::bank::DEFAULT_MANIFEST;
use crate::dsp::pitch_shift::{DEFAULT_PERCUSSION_TERMS, PercussionVocabulary};
use crate::dsp::sampler::Fades;
use crate::error::{RenderError, Result};

/// Normalization target, about -3 dBFS.
pub const DEFAULT_TARGET_PEAK: f64 = 0.708;

/// Parameters for one offline render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Tempo in cycles per second.
    pub cps: f64,
    /// Render length in cycles.
    pub total_cycles: f64,
    /// Cycles per render window.
    pub chunk_cycles: f64,
    /// Peak level the output is normalized to.
    pub target_peak: f64,
    /// Sample fade-in, 3 to 30 ms.
    pub fade_in_secs: f64,
    /// Sample fade-out, 10 to 50 ms.
    pub fade_out_secs: f64,
    /// Root-note manifest file name inside the sample directory.
    pub manifest_name: String,
    /// Substrings marking a sound as percussive for pitch shifting.
    pub percussion_vocabulary: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            sample_rate: 44100,
            cps: 0.5,
            total_cycles: 8.0,
            chunk_cycles: 8.0,
            target_peak: DEFAULT_TARGET_PEAK,
            fade_in_secs: 0.003,
            fade_out_secs: 0.01,
            manifest_name: DEFAULT_MANIFEST.to_string(),
            percussion_vocabulary: DEFAULT_PERCUSSION_TERMS
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

impl RenderConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| RenderError::read_file(path, e))?;
        let config: RenderConfig =
            serde_json::from_str(&text).map_err(|e| RenderError::parse(path, e))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the tempo in cycles per minute.
    pub fn with_cpm(mut self, cpm: f64) -> Self {
        self.cps = cpm / 60.0;
        self
    }

    pub fn with_cps(mut self, cps: f64) -> Self {
        self.cps = cps;
        self
    }

    pub fn with_cycles(mut self, total_cycles: f64) -> Self {
        self.total_cycles = total_cycles;
        self
    }

    pub fn with_chunk_cycles(mut self, chunk_cycles: f64) -> Self {
        self.chunk_cycles = chunk_cycles;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Tempo in cycles per minute.
    pub fn cpm(&self) -> f64 {
        self.cps * 60.0
    }

    /// Sample fades as configured.
    pub fn fades(&self) -> Fades {
        Fades {
            fade_in: self.fade_in_secs,
            fade_out: self.fade_out_secs,
        }
    }

    /// The configured percussion vocabulary.
    pub fn vocabulary(&self) -> PercussionVocabulary {
        PercussionVocabulary::new(&self.percussion_vocabulary)
    }

    /// Check every field is usable.
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f64) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(RenderError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )))
            }
        }
        fn within(name: &str, value: f64, min: f64, max: f64) -> Result<()> {
            if (min..=max).contains(&value) {
                Ok(())
            } else {
                Err(RenderError::InvalidConfig(format!(
                    "{name} must be within {min}..={max}, got {value}"
                )))
            }
        }

        if self.sample_rate == 0 {
            return Err(RenderError::InvalidConfig(
                "sample_rate must be positive".to_string(),
            ));
        }
        positive("cps", self.cps)?;
        positive("total_cycles", self.total_cycles)?;
        positive("chunk_cycles", self.chunk_cycles)?;
        within("target_peak", self.target_peak, 0.001, 1.0)?;
        within("fade_in_secs", self.fade_in_secs, 0.003, 0.03)?;
        within("fade_out_secs", self.fade_out_secs, 0.01, 0.05)?;
        Ok(())
    }
}
