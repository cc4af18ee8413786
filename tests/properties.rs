//! Property-based tests for pitch shifting and PCM conversion.
//!
//! Buffers stay short and the rate low so WSOLA runs stay cheap.

use haprender_core::SampleBuffer;
use haprender_core::dsp::pitch_shift::{PitchShifter, ShiftMode};
use haprender_core::dsp::renderer::pcm;
use haprender_core::dsp::resample::{resample, semitone_ratio};
use proptest::prelude::*;

const SR: u32 = 8000;

fn mode() -> impl Strategy<Value = ShiftMode> {
    prop_oneof![Just(ShiftMode::Percussive), Just(ShiftMode::Tonal)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Offsets under a cent leave the buffer untouched in both modes.
    #[test]
    fn tiny_shift_is_identity(
        data in prop::collection::vec(-1.0f32..=1.0f32, 0..400),
        semitones in -0.009f64..=0.009f64,
        mode in mode(),
    ) {
        let buffer = SampleBuffer::mono(data.clone(), SR);
        let shifted = PitchShifter::shift(&buffer, semitones, mode);
        prop_assert_eq!(shifted.channel(0), &data[..]);
    }

    /// Tonal shifts keep the sample length.
    #[test]
    fn tonal_shift_keeps_length(
        data in prop::collection::vec(-1.0f32..=1.0f32, 0..2000),
        semitones in -12.0f64..=12.0f64,
    ) {
        prop_assume!(semitones.abs() >= 0.01);
        let buffer = SampleBuffer::stereo(data.clone(), data.clone(), SR);
        let shifted = PitchShifter::shift(&buffer, semitones, ShiftMode::Tonal);
        prop_assert_eq!(shifted.len(), data.len());
        prop_assert_eq!(shifted.channel_count(), 2);
        for ch in shifted.channels() {
            prop_assert!(ch.iter().all(|s| s.is_finite()));
        }
    }

    /// Percussive shifts scale the length by the inverse pitch ratio.
    #[test]
    fn percussive_shift_scales_length(
        len in 1usize..4000,
        semitones in -24.0f64..=24.0f64,
    ) {
        // Below ~0.02 semitones the ratio is within the identity tolerance.
        prop_assume!(semitones.abs() >= 0.02);
        let data = vec![0.25f32; len];
        let ratio = semitone_ratio(semitones);
        let shifted = PitchShifter::shift_channel(&data, semitones, ShiftMode::Percussive, SR);
        prop_assert_eq!(shifted.len(), (len as f64 / ratio).round() as usize);
        prop_assert_eq!(shifted.len(), resample(&data, ratio).len());
    }

    /// Decoding an encoded sample lands within one LSB.
    #[test]
    fn pcm_within_one_lsb(x in -1.0f32..=1.0f32) {
        let back = pcm::decode_i16(pcm::encode_i16(x, 1.0));
        prop_assert!((back - x).abs() <= 1.0 / pcm::FULL_SCALE);
    }

    /// Encoding never wraps, whatever the gain.
    #[test]
    fn pcm_clamps(x in -4.0f32..=4.0f32, gain in 0.0f32..=8.0f32) {
        let s = pcm::encode_i16(x, gain);
        prop_assert!(s >= -32767);
        if x * gain >= 1.0 {
            prop_assert_eq!(s, 32767);
        }
    }
}
