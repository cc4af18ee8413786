//! ADSR envelope as a pure function of time.
//!
//! Offline rendering knows every note's length up front, so the envelope
//! is evaluated directly from `(t, duration)` instead of being stepped
//! through gate-on/gate-off state.

/// Linear attack/decay/release envelope. Times in seconds, sustain in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adsr {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

impl Default for Adsr {
    fn default() -> Self {
        Adsr {
            attack: 0.005,
            decay: 0.1,
            sustain: 0.7,
            release: 0.3,
        }
    }
}

impl Adsr {
    pub fn new(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        Adsr {
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// Envelope level at `t` seconds into a note lasting `duration`.
    ///
    /// The release ramp occupies the final `release` seconds of the note;
    /// anything outside `[0, duration)` is silent.
    pub fn level_at(&self, t: f64, duration: f64) -> f64 {
        if t < 0.0 || t >= duration {
            return 0.0;
        }
        if t < self.attack {
            t / self.attack
        } else if t < self.attack + self.decay {
            1.0 - (1.0 - self.sustain) * (t - self.attack) / self.decay
        } else if t < duration - self.release {
            self.sustain
        } else {
            self.sustain * ((duration - t) / self.release).max(0.0)
        }
    }
}
