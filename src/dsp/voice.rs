//! Single oscillator note shaped by an ADSR envelope.

use super::envelope::Adsr;
use super::oscillator::Waveform;

/// One synthesized note of known length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthVoice {
    pub waveform: Waveform,
    /// Frequency in Hz.
    pub frequency: f64,
    /// Note length in seconds.
    pub duration: f64,
    pub envelope: Adsr,
}

impl SynthVoice {
    pub fn new(waveform: Waveform, frequency: f64, duration: f64, envelope: Adsr) -> Self {
        SynthVoice {
            waveform,
            frequency,
            duration,
            envelope,
        }
    }

    /// Output at `t` seconds after the note starts, in [-1, 1].
    pub fn sample_at(&self, t: f64) -> f64 {
        let env = self.envelope.level_at(t, self.duration);
        if env == 0.0 {
            return 0.0;
        }
        self.waveform.sample(t * self.frequency) * env
    }

    /// Number of output frames covering the note at `sample_rate`.
    pub fn frames(&self, sample_rate: u32) -> usize {
        (self.duration.max(0.0) * sample_rate as f64).ceil() as usize
    }
}
