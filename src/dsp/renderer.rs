//! WAV renderer: renders a hap source to normalized 16-bit stereo PCM.
//!
//! The timeline is rendered window by window. Audio that rings past a
//! window end is carried into the next window, never re-triggered. Once
//! every window is mixed, the whole render is scaled so its peak hits the
//! configured target and converted to PCM.

use std::path::Path;

use tracing::{debug, info};

use super::bank::BankTable;
use super::engine::AudioEngine;
use super::mixer::StereoChunk;
use super::pitch_shift::ShiftModeClassifier;
use crate::config::RenderConfig;
use crate::error::{RenderError, Result};
use crate::hap::HapSource;

/// Log progress every this many windows.
const PROGRESS_EVERY: usize = 5;

/// Output channel count.
pub const CHANNELS: u16 = 2;

/// Float/PCM conversion.
pub mod pcm {
    /// Full-scale 16-bit value.
    pub const FULL_SCALE: f32 = 32767.0;

    /// Scale, clamp to [-1, 1] and quantize one sample.
    pub fn encode_i16(sample: f32, gain: f32) -> i16 {
        ((sample * gain).clamp(-1.0, 1.0) * FULL_SCALE).round() as i16
    }

    /// Inverse of [`encode_i16`] at unit gain, within one LSB.
    pub fn decode_i16(sample: i16) -> f32 {
        sample as f32 / FULL_SCALE
    }

    /// Interleave left/right into PCM frames.
    pub fn interleave(left: &[f32], right: &[f32], gain: f32) -> Vec<i16> {
        let mut out = Vec::with_capacity(left.len() * 2);
        for (&l, &r) in left.iter().zip(right) {
            out.push(encode_i16(l, gain));
            out.push(encode_i16(r, gain));
        }
        out
    }
}

/// Totals for one render.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderStats {
    /// Haps returned by the source across all windows.
    pub haps: usize,
    /// Haps rendered.
    pub scheduled: usize,
    pub chunks: usize,
    /// Stereo frames in the output.
    pub frames: usize,
    /// Largest absolute sample before normalization.
    pub raw_peak: f32,
    /// Gain applied to reach the target peak.
    pub gain: f32,
}

impl RenderStats {
    /// Raw peak in dBFS, or `None` for silence.
    pub fn raw_peak_db(&self) -> Option<f32> {
        (self.raw_peak > 0.0).then(|| 20.0 * self.raw_peak.log10())
    }
}

/// A finished render: interleaved stereo PCM plus statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub pcm: Vec<i16>,
    pub sample_rate: u32,
    pub stats: RenderStats,
}

impl RenderOutput {
    /// Encode as a WAV file image.
    pub fn to_wav(&self) -> Vec<u8> {
        encode_wav(&self.pcm, self.sample_rate, CHANNELS)
    }

    pub fn duration_secs(&self) -> f64 {
        self.stats.frames as f64 / self.sample_rate as f64
    }
}

/// Chunked offline renderer.
pub struct Renderer {
    engine: AudioEngine,
    config: RenderConfig,
}

impl Renderer {
    /// Build a renderer over `banks`. Fails if `config` is out of range.
    pub fn new(banks: BankTable, config: RenderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Renderer {
            engine: AudioEngine::new(banks, &config),
            config,
        })
    }

    /// Replace the shift-mode classifier.
    pub fn with_classifier(mut self, classifier: Box<dyn ShiftModeClassifier>) -> Self {
        self.engine = self.engine.with_classifier(classifier);
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn engine(&self) -> &AudioEngine {
        &self.engine
    }

    /// Render the configured number of cycles from `source`.
    pub fn render(&mut self, source: &dyn HapSource) -> Result<RenderOutput> {
        let total = self.config.total_cycles;
        let step = self.config.chunk_cycles;
        let mut left: Vec<f32> = Vec::new();
        let mut right: Vec<f32> = Vec::new();
        let mut carry = StereoChunk::default();
        let mut stats = RenderStats::default();

        info!(
            cycles = total,
            chunk = step,
            cps = self.config.cps,
            sample_rate = self.config.sample_rate,
            "Rendering"
        );

        loop {
            let begin = stats.chunks as f64 * step;
            if begin >= total {
                break;
            }
            // Same expression as the next window's begin, so windows meet exactly.
            let end = ((stats.chunks + 1) as f64 * step).min(total);

            let haps = source.query_window(begin, end);
            let (mut window, window_stats) = self.engine.render_window(&haps, begin, end);
            window.absorb(carry);
            carry = window.split_tail();

            stats.haps += window_stats.haps;
            stats.scheduled += window_stats.scheduled;
            stats.raw_peak = stats.raw_peak.max(window.peak());
            left.extend_from_slice(window.left());
            right.extend_from_slice(window.right());

            if stats.chunks % PROGRESS_EVERY == 0 || end >= total {
                info!(
                    percent = (end / total * 100.0).round(),
                    begin,
                    end,
                    scheduled = window_stats.scheduled,
                    "Rendered window"
                );
            }
            stats.chunks += 1;
        }

        if carry.frames() > 0 {
            debug!(frames = carry.frames(), "Dropping audio past the end of the render");
        }

        stats.frames = left.len();
        stats.gain = if stats.raw_peak > 0.0 {
            self.config.target_peak as f32 / stats.raw_peak
        } else {
            1.0
        };
        info!(
            raw_peak = stats.raw_peak,
            raw_peak_db = stats.raw_peak_db().unwrap_or(f32::NEG_INFINITY),
            gain = stats.gain,
            haps = stats.haps,
            scheduled = stats.scheduled,
            "Normalized output"
        );

        Ok(RenderOutput {
            pcm: pcm::interleave(&left, &right, stats.gain),
            sample_rate: self.config.sample_rate,
            stats,
        })
    }

    /// Render and write a WAV file. Nothing is written if rendering fails.
    pub fn render_to_file(&mut self, source: &dyn HapSource, path: &Path) -> Result<RenderStats> {
        let output = self.render(source)?;
        let bytes = output.to_wav();
        std::fs::write(path, &bytes).map_err(|e| RenderError::write(path, e))?;
        info!(
            path = ?path,
            bytes = bytes.len(),
            seconds = output.duration_secs(),
            "Wrote WAV"
        );
        Ok(output.stats)
    }
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::bank::SampleBank;
    use crate::dsp::sampler::SampleBuffer;
    use crate::hap::{Hap, HapValue, ScriptedHaps};

    fn le_u16(wav: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([wav[at], wav[at + 1]])
    }

    fn le_u32(wav: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([wav[at], wav[at + 1], wav[at + 2], wav[at + 3]])
    }

    fn config() -> RenderConfig {
        RenderConfig::default()
            .with_sample_rate(8000)
            .with_cps(1.0)
            .with_cycles(2.0)
            .with_chunk_cycles(1.0)
    }

    fn renderer(config: RenderConfig) -> Renderer {
        Renderer::new(BankTable::new(), config).unwrap()
    }

    #[test]
    fn wav_header_valid() {
        let wav = encode_wav(&[0, 1, -1, i16::MAX], 44100, 2);

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(le_u32(&wav, 4), 36 + 8);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(le_u32(&wav, 16), 16);
        assert_eq!(le_u16(&wav, 20), 1);
        assert_eq!(le_u16(&wav, 22), 2);
        assert_eq!(le_u32(&wav, 24), 44100);
        assert_eq!(le_u32(&wav, 28), 44100 * 4);
        assert_eq!(le_u16(&wav, 32), 4);
        assert_eq!(le_u16(&wav, 34), 16);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(le_u32(&wav, 40), 8);
        assert_eq!(wav.len(), 44 + 8);
        assert_eq!(i16::from_le_bytes([wav[50], wav[51]]), i16::MAX);
    }

    #[test]
    fn wav_size_matches_render_length() {
        let mut r = renderer(config());
        let out = r.render(&ScriptedHaps::default()).unwrap();
        // 2 cycles at 1 cps and 8 kHz.
        assert_eq!(out.stats.frames, 16000);
        assert_eq!(out.stats.chunks, 2);
        let wav = out.to_wav();
        assert_eq!(le_u32(&wav, 40), 16000 * 4);
        assert_eq!(wav.len(), 44 + 16000 * 4);
    }

    #[test]
    fn silence_stays_silent() {
        let mut r = renderer(config());
        let out = r.render(&ScriptedHaps::default()).unwrap();
        assert!(out.pcm.iter().all(|&s| s == 0));
        assert_eq!(out.stats.gain, 1.0);
        assert_eq!(out.stats.raw_peak_db(), None);
    }

    #[test]
    fn normalizes_to_target_peak() {
        let mut haps = ScriptedHaps::default();
        haps.push(0.0, 1.0, HapValue::sound("sine").with_note("a4").with_gain(0.2));
        haps.push(1.0, 2.0, HapValue::sound("square").with_note("a3").with_gain(0.9));
        let mut r = renderer(config());
        let out = r.render(&haps).unwrap();

        let max = out.pcm.iter().map(|s| s.unsigned_abs()).max().unwrap();
        let target = (0.708 * 32767.0_f32).round() as u16;
        assert!(max.abs_diff(target) <= 1, "peak {max}, expected {target}");
        assert_eq!(out.stats.scheduled, 2);
        assert!(out.stats.raw_peak > 0.0);
    }

    #[test]
    fn pcm_round_trip_within_one_lsb() {
        for i in -100..=100 {
            let x = i as f32 / 100.0;
            let back = pcm::decode_i16(pcm::encode_i16(x, 1.0));
            assert!((back - x).abs() <= 1.0 / 32767.0, "{x} -> {back}");
        }
        assert_eq!(pcm::encode_i16(3.0, 1.0), 32767);
        assert_eq!(pcm::encode_i16(-3.0, 1.0), -32767);
    }

    #[test]
    fn long_hap_triggers_once_across_windows() {
        let mut banks = BankTable::new();
        banks.insert(SampleBank::new("pad", vec![SampleBuffer::mono(vec![0.5; 24000], 8000)]));
        let mut haps = ScriptedHaps::default();
        haps.push(0.0, 3.0, HapValue::sound("pad"));
        haps.push(1.5, 2.0, HapValue::sound("sine").with_gain(0.1));

        let chunked = config().with_cycles(3.0).with_chunk_cycles(1.0);
        let whole = config().with_cycles(3.0).with_chunk_cycles(3.0);
        let a = Renderer::new(banks.clone(), chunked).unwrap().render(&haps).unwrap();
        let b = Renderer::new(banks, whole).unwrap().render(&haps).unwrap();

        assert_eq!(a.stats.scheduled, 2);
        assert_eq!(a.stats.chunks, 3);
        assert_eq!(a.pcm, b.pcm);

        // No second fade-in at the window boundary.
        let at_boundary = a.pcm[2 * 8000];
        let before = a.pcm[2 * 7999];
        assert_eq!(at_boundary, before);
    }

    #[test]
    fn inexact_chunk_boundaries_trigger_once() {
        let mut haps = ScriptedHaps::default();
        haps.push(0.3, 0.35, HapValue::sound("square"));
        haps.push(0.7, 0.75, HapValue::sound("sine").with_gain(0.2));
        // Rounds onto the frame of the 0.6 boundary from below.
        haps.push(0.59999999, 0.65, HapValue::sound("sawtooth").with_gain(0.2));

        for step in [0.1, 0.3, 0.7] {
            let chunked = renderer(config().with_cycles(1.0).with_chunk_cycles(step))
                .render(&haps)
                .unwrap();
            let whole = renderer(config().with_cycles(1.0).with_chunk_cycles(1.0))
                .render(&haps)
                .unwrap();
            assert_eq!(chunked.stats.scheduled, 3, "step {step}");
            assert_eq!(chunked.stats.raw_peak, whole.stats.raw_peak, "step {step}");
            assert_eq!(chunked.pcm, whole.pcm, "step {step}");
        }
    }

    #[test]
    fn clipped_sample_carries_into_next_window() {
        let mut banks = BankTable::new();
        banks.insert(SampleBank::new("vox", vec![SampleBuffer::mono(vec![0.5; 10000], 8000)]));
        let mut haps = ScriptedHaps::default();
        haps.push(0.5, 0.75, HapValue::sound("vox").with_clip(1.0));

        let mut r = Renderer::new(banks, config()).unwrap();
        let out = r.render(&haps).unwrap();
        // 1.25 s of audio from 0.5 s: still sounding at 1.625 s.
        assert!(out.pcm[2 * 13000] > 0);
        assert_eq!(out.pcm[2 * 15000], 0);
    }

    #[test]
    fn render_to_file_writes_wav() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.wav");
        let mut haps = ScriptedHaps::default();
        haps.push(0.0, 1.0, HapValue::sound("sine"));

        let stats = renderer(config()).render_to_file(&haps, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(bytes.len(), 44 + stats.frames * 4);
    }

    #[test]
    fn render_to_missing_directory_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.wav");
        let err = renderer(config())
            .render_to_file(&ScriptedHaps::default(), &path)
            .unwrap_err();
        assert!(matches!(err, RenderError::Write { .. }), "got {err}");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = Renderer::new(BankTable::new(), config().with_cps(-1.0))
            .err()
            .unwrap();
        assert!(matches!(err, RenderError::InvalidConfig(_)));
    }

    #[test]
    fn closure_sources_work() {
        let source = |begin: f64, _end: f64| {
            if begin == 0.0 {
                vec![Hap::new(0.0, 0.5, HapValue::sound("saw"))]
            } else {
                Vec::new()
            }
        };
        let out = renderer(config()).render(&source).unwrap();
        assert_eq!(out.stats.scheduled, 1);
        assert_eq!(out.stats.haps, 1);
    }
}
