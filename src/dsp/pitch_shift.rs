//! Pitch shifting for sample buffers.
//!
//! Two modes:
//! - **Percussive**: plain resampling. Pitch and duration change together,
//!   the way a drum machine repitches a hit.
//! - **Tonal**: resample, then WSOLA-stretch back to the original length so
//!   a melodic sample keeps its duration at the new pitch.
//!
//! Which mode a sound gets is decided by a [`ShiftModeClassifier`]; the
//! default [`PercussionVocabulary`] matches drum-ish substrings in the
//! sound name. [`ShiftCache`] memoizes shifted buffers per sample and offset.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use super::resample::{IDENTITY_TOLERANCE, resample, semitone_ratio};
use super::sampler::SampleBuffer;
use super::wsola::wsola_stretch;

/// Offsets smaller than this (in semitones) are not shifted.
pub const MIN_SHIFT_SEMITONES: f64 = 0.01;

/// Substrings that mark a sound as percussive.
pub const DEFAULT_PERCUSSION_TERMS: &[&str] = &[
    "kick", "hat", "clap", "snare", "perc", "rim", "tom", "crash", "ride", "cymbal", "808bd",
    "808hc", "808oh", "808sd", "bd", "sd", "hh", "cp", "cb", "cr", "ht", "lt", "mt", "ghost",
];

/// How a sample is transposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftMode {
    /// Resample only; duration scales by `1 / ratio`.
    Percussive,
    /// Resample then time-stretch; duration is preserved.
    Tonal,
}

/// Picks a [`ShiftMode`] for a sound name.
pub trait ShiftModeClassifier {
    fn classify(&self, sound: &str) -> ShiftMode;
}

/// Case-insensitive substring vocabulary of percussive sound names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PercussionVocabulary {
    terms: Vec<String>,
}

impl Default for PercussionVocabulary {
    fn default() -> Self {
        PercussionVocabulary::new(DEFAULT_PERCUSSION_TERMS.iter().copied())
    }
}

impl PercussionVocabulary {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        PercussionVocabulary {
            terms: terms
                .into_iter()
                .map(|t| t.as_ref().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_percussive(&self, sound: &str) -> bool {
        let sound = sound.to_lowercase();
        self.terms.iter().any(|t| sound.contains(t.as_str()))
    }
}

impl ShiftModeClassifier for PercussionVocabulary {
    fn classify(&self, sound: &str) -> ShiftMode {
        if self.is_percussive(sound) {
            ShiftMode::Percussive
        } else {
            ShiftMode::Tonal
        }
    }
}

/// Stateless pitch-shift operations.
pub struct PitchShifter;

impl PitchShifter {
    /// Shift one channel by `semitones`. `sample_rate` sizes WSOLA grains.
    pub fn shift_channel(
        data: &[f32],
        semitones: f64,
        mode: ShiftMode,
        sample_rate: u32,
    ) -> Cow<'_, [f32]> {
        let ratio = semitone_ratio(semitones);
        if semitones.abs() < MIN_SHIFT_SEMITONES || (ratio - 1.0).abs() < IDENTITY_TOLERANCE {
            return Cow::Borrowed(data);
        }
        let resampled = resample(data, ratio);
        match mode {
            ShiftMode::Percussive => resampled,
            ShiftMode::Tonal => Cow::Owned(wsola_stretch(&resampled, data.len(), sample_rate)),
        }
    }

    /// Shift every channel of `buffer`. Borrows the input when the offset
    /// is too small to matter.
    pub fn shift(buffer: &SampleBuffer, semitones: f64, mode: ShiftMode) -> Cow<'_, SampleBuffer> {
        if semitones.abs() < MIN_SHIFT_SEMITONES
            || (semitone_ratio(semitones) - 1.0).abs() < IDENTITY_TOLERANCE
        {
            return Cow::Borrowed(buffer);
        }
        let channels = buffer
            .channels()
            .iter()
            .map(|ch| Self::shift_channel(ch, semitones, mode, buffer.sample_rate()).into_owned())
            .collect();
        Cow::Owned(SampleBuffer::new(channels, buffer.sample_rate()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ShiftKey {
    bank: String,
    index: usize,
    cents: i64,
    mode: ShiftMode,
}

/// Memoized shifted buffers keyed by `(bank, index, cents, mode)`.
///
/// Offsets are quantized to whole cents before shifting, so two requests
/// that share a key always get identical audio.
#[derive(Debug, Default)]
pub struct ShiftCache {
    entries: HashMap<ShiftKey, Arc<SampleBuffer>>,
    logged: HashSet<(String, i64)>,
}

impl ShiftCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shifted copy of `source`, computing it on first use.
    pub fn get_or_shift(
        &mut self,
        bank: &str,
        index: usize,
        source: &Arc<SampleBuffer>,
        semitones: f64,
        mode: ShiftMode,
    ) -> Arc<SampleBuffer> {
        if semitones.abs() < MIN_SHIFT_SEMITONES {
            return Arc::clone(source);
        }
        let cents = (semitones * 100.0).round() as i64;
        let key = ShiftKey {
            bank: bank.to_string(),
            index,
            cents,
            mode,
        };
        if let Some(hit) = self.entries.get(&key) {
            return Arc::clone(hit);
        }

        if self.logged.insert((bank.to_string(), cents)) {
            debug!(bank, index, semitones = cents as f64 / 100.0, ?mode, "pitch-shifting sample");
        }
        let shifted = match PitchShifter::shift(source, cents as f64 / 100.0, mode) {
            Cow::Borrowed(_) => Arc::clone(source),
            Cow::Owned(buf) => Arc::new(buf),
        };
        self.entries.insert(key, Arc::clone(&shifted));
        shifted
    }

    /// Number of cached buffers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::{FftPlanner, num_complex::Complex};
    use std::f64::consts::PI;

    fn sine(freq: f64, sr: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f64 / sr as f64).sin() as f32 * 0.8)
            .collect()
    }

    /// Frequency of the strongest FFT bin.
    fn dominant_frequency(signal: &[f32], sr: u32) -> f64 {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(signal.len());
        let mut buf: Vec<Complex<f32>> = signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
        fft.process(&mut buf);
        let (bin, _) = buf[1..signal.len() / 2]
            .iter()
            .enumerate()
            .fold((0, 0.0_f32), |best, (i, c)| {
                if c.norm() > best.1 { (i + 1, c.norm()) } else { best }
            });
        bin as f64 * sr as f64 / signal.len() as f64
    }

    #[test]
    fn default_vocabulary_classifies_drums() {
        let vocab = PercussionVocabulary::default();
        for name in ["bd", "808sd", "HH", "my_kick", "Crash2", "ghostnote"] {
            assert_eq!(vocab.classify(name), ShiftMode::Percussive, "{name}");
        }
        for name in ["piano", "strings", "sine", "flute"] {
            assert_eq!(vocab.classify(name), ShiftMode::Tonal, "{name}");
        }
        assert_eq!(vocab.terms().len(), DEFAULT_PERCUSSION_TERMS.len());
    }

    #[test]
    fn custom_vocabulary() {
        let vocab = PercussionVocabulary::new(["Conga", ""]);
        assert_eq!(vocab.terms(), &["conga".to_string()]);
        assert_eq!(vocab.classify("conga_lo"), ShiftMode::Percussive);
        assert_eq!(vocab.classify("bd"), ShiftMode::Tonal);
    }

    #[test]
    fn zero_offset_borrows() {
        let buf = SampleBuffer::mono(sine(440.0, 8000, 500), 8000);
        for mode in [ShiftMode::Percussive, ShiftMode::Tonal] {
            assert!(matches!(PitchShifter::shift(&buf, 0.0, mode), Cow::Borrowed(_)));
            assert!(matches!(PitchShifter::shift(&buf, 0.005, mode), Cow::Borrowed(_)));
        }
        let empty = SampleBuffer::mono(Vec::new(), 8000);
        assert!(PitchShifter::shift(&empty, 0.0, ShiftMode::Tonal).is_empty());
    }

    #[test]
    fn percussive_changes_length() {
        let buf = SampleBuffer::stereo(vec![0.1; 1000], vec![-0.1; 1000], 8000);
        let up = PitchShifter::shift(&buf, 12.0, ShiftMode::Percussive);
        assert_eq!(up.len(), 500);
        assert_eq!(up.channel_count(), 2);
        let down = PitchShifter::shift(&buf, -5.0, ShiftMode::Percussive);
        assert_eq!(down.len(), (1000.0 / semitone_ratio(-5.0)).round() as usize);
    }

    #[test]
    fn tonal_preserves_length() {
        let buf = SampleBuffer::mono(sine(300.0, 8000, 3000), 8000);
        for st in [-7.0, -1.0, 2.0, 12.0] {
            let out = PitchShifter::shift(&buf, st, ShiftMode::Tonal);
            assert_eq!(out.len(), 3000, "semitones {st}");
            assert_eq!(out.sample_rate(), 8000);
        }
    }

    #[test]
    fn octave_up_doubles_frequency() {
        let sr = 16000;
        let buf = SampleBuffer::mono(sine(250.0, sr, sr as usize), sr);

        let tonal = PitchShifter::shift(&buf, 12.0, ShiftMode::Tonal);
        assert_eq!(tonal.len(), buf.len());
        let f = dominant_frequency(tonal.channel(0), sr);
        assert!((f - 500.0).abs() < 5.0, "tonal dominant frequency {f}");

        let perc = PitchShifter::shift(&buf, 12.0, ShiftMode::Percussive);
        assert_eq!(perc.len(), buf.len() / 2);
        let f = dominant_frequency(perc.channel(0), sr);
        assert!((f - 500.0).abs() < 5.0, "percussive dominant frequency {f}");
    }

    #[test]
    fn cache_memoizes_by_cents() {
        let source = Arc::new(SampleBuffer::mono(vec![0.25; 400], 8000));
        let mut cache = ShiftCache::new();

        let a = cache.get_or_shift("piano", 0, &source, 3.0, ShiftMode::Tonal);
        let b = cache.get_or_shift("piano", 0, &source, 3.001, ShiftMode::Tonal);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        cache.get_or_shift("piano", 0, &source, 3.0, ShiftMode::Percussive);
        cache.get_or_shift("piano", 1, &source, 3.0, ShiftMode::Tonal);
        cache.get_or_shift("piano", 0, &source, 4.0, ShiftMode::Tonal);
        assert_eq!(cache.len(), 4);
    }

    #[test]
    fn cache_skips_tiny_offsets() {
        let source = Arc::new(SampleBuffer::mono(vec![0.25; 400], 8000));
        let mut cache = ShiftCache::new();
        let same = cache.get_or_shift("bd", 0, &source, 0.004, ShiftMode::Percussive);
        assert!(Arc::ptr_eq(&same, &source));
        assert!(cache.is_empty());
    }
}
