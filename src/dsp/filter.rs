//! Single-pole low-pass and high-pass filters.

use std::f64::consts::PI;

/// Filter response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    Lowpass,
    Highpass,
}

/// A first-order IIR filter (RC model).
///
/// The cutoff is clamped to just below Nyquist.
#[derive(Debug, Clone)]
pub struct OnePole {
    pub filter_type: FilterType,
    alpha: f64,
    prev_in: f64,
    prev_out: f64,
}

impl OnePole {
    pub fn new(filter_type: FilterType, cutoff: f64, sample_rate: u32) -> Self {
        let sr = sample_rate as f64;
        let cutoff = cutoff.min(sr * 0.49).max(1.0);
        let dt = 1.0 / sr;
        let rc = 1.0 / (2.0 * PI * cutoff);
        let alpha = match filter_type {
            FilterType::Lowpass => dt / (rc + dt),
            FilterType::Highpass => rc / (rc + dt),
        };
        OnePole {
            filter_type,
            alpha,
            prev_in: 0.0,
            prev_out: 0.0,
        }
    }

    pub fn lowpass(cutoff: f64, sample_rate: u32) -> Self {
        OnePole::new(FilterType::Lowpass, cutoff, sample_rate)
    }

    pub fn highpass(cutoff: f64, sample_rate: u32) -> Self {
        OnePole::new(FilterType::Highpass, cutoff, sample_rate)
    }

    /// Process one sample.
    pub fn process(&mut self, input: f64) -> f64 {
        let out = match self.filter_type {
            FilterType::Lowpass => self.prev_out + self.alpha * (input - self.prev_out),
            FilterType::Highpass => self.alpha * (self.prev_out + input - self.prev_in),
        };
        self.prev_in = input;
        self.prev_out = out;
        out
    }
}

/// Optional low-pass followed by optional high-pass, for one channel.
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    lowpass: Option<OnePole>,
    highpass: Option<OnePole>,
}

impl FilterChain {
    pub fn new(lpf: Option<f64>, hpf: Option<f64>, sample_rate: u32) -> Self {
        FilterChain {
            lowpass: lpf.map(|f| OnePole::lowpass(f, sample_rate)),
            highpass: hpf.map(|f| OnePole::highpass(f, sample_rate)),
        }
    }

    pub fn process(&mut self, input: f64) -> f64 {
        let mut x = input;
        if let Some(lp) = self.lowpass.as_mut() {
            x = lp.process(x);
        }
        if let Some(hp) = self.highpass.as_mut() {
            x = hp.process(x);
        }
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_rms(filter: &mut OnePole, freq: f64, sr: u32) -> f64 {
        let n = sr as usize;
        let mut sum = 0.0;
        for i in 0..n {
            let x = (2.0 * PI * freq * i as f64 / sr as f64).sin();
            let y = filter.process(x);
            // Skip the settling period
            if i > n / 4 {
                sum += y * y;
            }
        }
        (sum / (n - n / 4 - 1) as f64).sqrt()
    }

    #[test]
    fn lowpass_passes_dc() {
        let mut f = OnePole::lowpass(1000.0, 44100);
        let mut y = 0.0;
        for _ in 0..10000 {
            y = f.process(1.0);
        }
        assert!((y - 1.0).abs() < 1e-6, "DC should pass, got {y}");
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut f = OnePole::highpass(200.0, 44100);
        let mut y = 1.0;
        for _ in 0..44100 {
            y = f.process(1.0);
        }
        assert!(y.abs() < 1e-6, "DC should be blocked, got {y}");
    }

    #[test]
    fn lowpass_attenuates_highs() {
        let low = sine_rms(&mut OnePole::lowpass(500.0, 44100), 100.0, 44100);
        let high = sine_rms(&mut OnePole::lowpass(500.0, 44100), 8000.0, 44100);
        assert!(low > 0.6, "100Hz should mostly pass, rms={low}");
        assert!(high < 0.1, "8kHz should be attenuated, rms={high}");
    }

    #[test]
    fn highpass_attenuates_lows() {
        let low = sine_rms(&mut OnePole::highpass(2000.0, 44100), 50.0, 44100);
        let high = sine_rms(&mut OnePole::highpass(2000.0, 44100), 10000.0, 44100);
        assert!(low < 0.05, "50Hz should be attenuated, rms={low}");
        assert!(high > 0.5, "10kHz should mostly pass, rms={high}");
    }

    #[test]
    fn cutoff_above_nyquist_is_clamped() {
        let mut f = OnePole::lowpass(1.0e6, 8000);
        for i in 0..100 {
            assert!(f.process((i as f64).sin()).is_finite());
        }
    }

    #[test]
    fn empty_chain_passes_input_through() {
        let mut chain = FilterChain::new(None, None, 44100);
        for x in [0.42, -1.0, 0.0, 0.7] {
            assert_eq!(chain.process(x), x);
        }
    }
}
