//! Rate resampling by linear interpolation.
//!
//! Reading the input at `ratio` samples per output sample raises the pitch
//! by `ratio` and shortens the signal by the same factor.

use std::borrow::Cow;

/// Ratios this close to 1 are treated as no change.
pub const IDENTITY_TOLERANCE: f64 = 0.001;

/// Frequency ratio for a shift of `semitones`.
pub fn semitone_ratio(semitones: f64) -> f64 {
    2.0_f64.powf(semitones / 12.0)
}

/// Output length for resampling `len` samples at `ratio`.
pub fn resampled_len(len: usize, ratio: f64) -> usize {
    if (ratio - 1.0).abs() < IDENTITY_TOLERANCE || ratio <= 0.0 || !ratio.is_finite() {
        return len;
    }
    (len as f64 / ratio).round().max(0.0) as usize
}

/// Resample `data` by `ratio` (> 1 is higher and shorter).
///
/// Past the last input sample `s0` reads as silence and `s1` repeats `s0`.
/// Non-positive or non-finite ratios leave the input untouched.
pub fn resample(data: &[f32], ratio: f64) -> Cow<'_, [f32]> {
    if (ratio - 1.0).abs() < IDENTITY_TOLERANCE || ratio <= 0.0 || !ratio.is_finite() {
        return Cow::Borrowed(data);
    }

    let out_len = resampled_len(data.len(), ratio);
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let pos = i as f64 * ratio;
        let idx = pos.floor() as usize;
        let frac = pos - idx as f64;
        let s0 = data.get(idx).copied().unwrap_or(0.0) as f64;
        let s1 = data.get(idx + 1).map_or(s0, |&s| s as f64);
        out.push((s0 * (1.0 - frac) + s1 * frac) as f32);
    }
    Cow::Owned(out)
}
