//! Naive (non-band-limited) oscillator waveforms.
//!
//! Each waveform is a pure function of phase measured in cycles, so a
//! voice can be evaluated at any time without carrying state.

use std::f64::consts::PI;

/// Supported waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Waveform {
    Sine,
    Triangle,
    Sawtooth,
    Square,
}

impl Waveform {
    /// Resolve a sound name, including the short aliases.
    pub fn from_name(name: &str) -> Option<Waveform> {
        match name {
            "sine" => Some(Waveform::Sine),
            "triangle" | "tri" => Some(Waveform::Triangle),
            "sawtooth" | "saw" => Some(Waveform::Sawtooth),
            "square" => Some(Waveform::Square),
            _ => None,
        }
    }

    /// Value in [-1, 1] at `phase` cycles.
    pub fn sample(self, phase: f64) -> f64 {
        let frac = phase - phase.floor();
        match self {
            Waveform::Sine => (2.0 * PI * phase).sin(),
            Waveform::Triangle => {
                if frac < 0.5 {
                    4.0 * frac - 1.0
                } else {
                    3.0 - 4.0 * frac
                }
            }
            Waveform::Sawtooth => 2.0 * frac - 1.0,
            Waveform::Square => {
                if frac < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }
}
