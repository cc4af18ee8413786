//! Audio engine: renders the haps of one window into a stereo chunk.
//!
//! Each hap with an onset in the window is resolved to either a sample
//! (from the [`BankTable`]) or an oscillator, rendered from its onset for
//! its whole length, and summed into the chunk. Frames past the window end
//! go to the chunk's overflow so the pipeline can carry them forward.

use std::collections::HashSet;
use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use tracing::warn;

use crate::config::RenderConfig;
use crate::hap::Hap;
use crate::note::A4_FREQUENCY;

use super::bank::BankTable;
use super::filter::FilterChain;
use super::mixer::StereoChunk;
use super::oscillator::Waveform;
use super::pitch_shift::{MIN_SHIFT_SEMITONES, ShiftCache, ShiftModeClassifier};
use super::sampler::{Fades, SamplePlayback};
use super::voice::SynthVoice;

/// Haps quieter than this are not rendered.
const MIN_GAIN: f64 = 0.001;

/// Counters for one rendered window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowStats {
    /// Haps returned by the source for the window.
    pub haps: usize,
    /// Haps that were actually rendered.
    pub scheduled: usize,
}

/// Constant-power pan gains `(left, right)` for `pan` in [0, 1].
pub fn pan_gains(pan: f64) -> (f64, f64) {
    let angle = pan * FRAC_PI_2;
    (angle.cos(), angle.sin())
}

/// Per-hap output stage: gain, pan and optional filters.
struct HapOutput {
    gain_l: f64,
    gain_r: f64,
    filter_l: FilterChain,
    filter_r: FilterChain,
}

impl HapOutput {
    fn new(gain: f64, pan: f64, lpf: Option<f64>, hpf: Option<f64>, sample_rate: u32) -> Self {
        let (l, r) = pan_gains(pan);
        let filter = FilterChain::new(lpf, hpf, sample_rate);
        HapOutput {
            gain_l: gain * l,
            gain_r: gain * r,
            filter_l: filter.clone(),
            filter_r: filter,
        }
    }

    fn process(&mut self, left: f64, right: f64) -> (f32, f32) {
        let l = self.filter_l.process(left) * self.gain_l;
        let r = self.filter_r.process(right) * self.gain_r;
        (l as f32, r as f32)
    }
}

/// The offline audio engine.
///
/// Owns the sample banks, the pitch-shift cache and the set of sound names
/// already reported as unknown.
pub struct AudioEngine {
    pub sample_rate: u32,
    /// Tempo in cycles per second.
    pub cps: f64,
    fades: Fades,
    banks: BankTable,
    classifier: Box<dyn ShiftModeClassifier>,
    cache: ShiftCache,
    warned: HashSet<String>,
}

impl AudioEngine {
    pub fn new(banks: BankTable, config: &RenderConfig) -> Self {
        AudioEngine {
            sample_rate: config.sample_rate,
            cps: config.cps,
            fades: config.fades(),
            banks,
            classifier: Box::new(config.vocabulary()),
            cache: ShiftCache::new(),
            warned: HashSet::new(),
        }
    }

    /// Replace the shift-mode classifier.
    pub fn with_classifier(mut self, classifier: Box<dyn ShiftModeClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn banks(&self) -> &BankTable {
        &self.banks
    }

    pub fn shift_cache(&self) -> &ShiftCache {
        &self.cache
    }

    /// Sound names that fell back to the default tone.
    pub fn unknown_sounds(&self) -> &HashSet<String> {
        &self.warned
    }

    /// Absolute output frame of a cycle position.
    pub fn cycle_to_frame(&self, cycle: f64) -> usize {
        (cycle / self.cps * self.sample_rate as f64).round().max(0.0) as usize
    }

    /// Render every hap whose onset frame lies in this window.
    ///
    /// The chunk covers `cycle_to_frame(begin)..cycle_to_frame(end)`, so
    /// consecutive windows tile the timeline exactly and each onset frame
    /// falls in exactly one of them.
    pub fn render_window(
        &mut self,
        haps: &[Hap],
        begin_cycle: f64,
        end_cycle: f64,
    ) -> (StereoChunk, WindowStats) {
        let start_frame = self.cycle_to_frame(begin_cycle);
        let end_frame = self.cycle_to_frame(end_cycle).max(start_frame);
        let mut chunk = StereoChunk::new(end_frame - start_frame);
        let mut stats = WindowStats {
            haps: haps.len(),
            scheduled: 0,
        };

        for hap in haps {
            // A hap belongs to the window holding its onset frame, so
            // continuation fragments and boundary rounding never retrigger.
            let whole = hap.whole_or_part();
            let onset_frame = self.cycle_to_frame(whole.begin);
            if whole.begin < 0.0 || onset_frame < start_frame || onset_frame >= end_frame {
                continue;
            }
            let value = &hap.value;
            let gain = value.gain();
            if gain <= MIN_GAIN {
                continue;
            }

            let offset = onset_frame - start_frame;
            let duration = (whole.duration() / self.cps).max(0.0);
            let mut output = HapOutput::new(
                gain,
                value.pan(),
                value.lowpass(),
                value.highpass(),
                self.sample_rate,
            );

            let sound = value.sound_name();
            if let Some(resolved) = self.banks.resolve(sound, value.index()) {
                let mut buffer = Arc::clone(resolved.buffer);
                if let Some(target) = value.target_midi() {
                    let semitones = target - self.banks.root_note(resolved.bank) as f64;
                    if semitones.abs() >= MIN_SHIFT_SEMITONES {
                        let mode = self.classifier.classify(resolved.bank);
                        buffer = self.cache.get_or_shift(
                            resolved.bank,
                            resolved.index,
                            &buffer,
                            semitones,
                            mode,
                        );
                    }
                }
                let playback = SamplePlayback::new(
                    &buffer,
                    value.playback_speed(),
                    duration,
                    value.clips(),
                    self.fades,
                );
                mix_sample(&mut chunk, offset, &playback, &mut output, self.sample_rate);
            } else {
                let waveform = match Waveform::from_name(sound) {
                    Some(w) => w,
                    None => {
                        if self.warned.insert(sound.to_string()) {
                            warn!(sound, "Unknown sound, using the default triangle tone");
                        }
                        Waveform::Triangle
                    }
                };
                let frequency = value.frequency().unwrap_or(A4_FREQUENCY);
                let voice = SynthVoice::new(waveform, frequency, duration, value.adsr());
                mix_voice(&mut chunk, offset, &voice, &mut output, self.sample_rate);
            }
            stats.scheduled += 1;
        }

        (chunk, stats)
    }
}

fn mix_sample(
    chunk: &mut StereoChunk,
    offset: usize,
    playback: &SamplePlayback<'_>,
    output: &mut HapOutput,
    sample_rate: u32,
) {
    let sr = sample_rate as f64;
    for i in 0..playback.frames(sample_rate) {
        let Some((l, r)) = playback.frame_at(i as f64 / sr) else {
            break;
        };
        let (l, r) = output.process(l as f64, r as f64);
        chunk.add(offset + i, l, r);
    }
}

fn mix_voice(
    chunk: &mut StereoChunk,
    offset: usize,
    voice: &SynthVoice,
    output: &mut HapOutput,
    sample_rate: u32,
) {
    let sr = sample_rate as f64;
    for i in 0..voice.frames(sample_rate) {
        let s = voice.sample_at(i as f64 / sr);
        let (l, r) = output.process(s, s);
        chunk.add(offset + i, l, r);
    }
}
