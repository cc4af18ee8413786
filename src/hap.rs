//! Haps: scheduled events consumed by the renderer.
//!
//! A hap carries the full extent of its event (`whole`) and the fragment
//! of it that falls inside the queried window (`part`). The renderer only
//! triggers a hap on the fragment that contains its onset.
//!
//! Haps are produced by an external pattern engine through the
//! [`HapSource`] trait. [`ScriptedHaps`] is a plain event list that
//! implements it, loadable from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dsp::envelope::Adsr;
use crate::error::{RenderError, Result};
use crate::note::{frequency_to_midi, midi_to_frequency, note_to_midi};

/// Sound used when a hap names none.
pub const DEFAULT_SOUND: &str = "triangle";

/// Gain used when a hap does not set one.
pub const DEFAULT_GAIN: f64 = 0.3;

/// A half-open span of time `[begin, end)` in cycles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub begin: f64,
    pub end: f64,
}

impl TimeSpan {
    pub fn new(begin: f64, end: f64) -> Self {
        TimeSpan { begin, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.begin
    }

    /// The overlap of two spans. A zero-length span intersects a window
    /// when its begin lies inside it.
    pub fn intersect(&self, other: &TimeSpan) -> Option<TimeSpan> {
        let begin = self.begin.max(other.begin);
        let end = self.end.min(other.end);
        if begin < end || (self.begin == self.end && begin == end && begin < other.end) {
            Some(TimeSpan { begin, end })
        } else {
            None
        }
    }
}

/// A target pitch: either a note name or a MIDI number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteValue {
    Midi(f64),
    Name(String),
}

impl NoteValue {
    /// Fractional MIDI note number, or `None` for unparseable names.
    pub fn to_midi(&self) -> Option<f64> {
        match self {
            NoteValue::Midi(m) => Some(*m),
            NoteValue::Name(name) => note_to_midi(name).map(f64::from),
        }
    }
}

impl From<&str> for NoteValue {
    fn from(name: &str) -> Self {
        NoteValue::Name(name.to_string())
    }
}

impl From<f64> for NoteValue {
    fn from(midi: f64) -> Self {
        NoteValue::Midi(midi)
    }
}

/// Per-event parameters. Every field is optional; accessors apply the
/// defaults and clamping the renderer relies on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HapValue {
    /// Sound: a bank name, `bank:index`, or an oscillator waveform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<String>,
    /// Sample index within the bank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<NoteValue>,
    /// Absolute frequency in Hz. `note` wins when both are set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gain: Option<f64>,
    /// Stereo position, 0 = left, 1 = right.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan: Option<f64>,
    /// Low-pass cutoff in Hz.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "cutoff")]
    pub lpf: Option<f64>,
    /// High-pass cutoff in Hz.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "hcutoff")]
    pub hpf: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sustain: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release: Option<f64>,
    /// `clip >= 1` lets a sample ring for its full length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip: Option<f64>,
    /// Playback-rate multiplier for samples.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

impl HapValue {
    /// A value that plays the given sound with every other field unset.
    pub fn sound(s: &str) -> Self {
        HapValue {
            s: Some(s.to_string()),
            ..Default::default()
        }
    }

    pub fn with_note(mut self, note: impl Into<NoteValue>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_n(mut self, n: f64) -> Self {
        self.n = Some(n);
        self
    }

    pub fn with_freq(mut self, freq: f64) -> Self {
        self.freq = Some(freq);
        self
    }

    pub fn with_gain(mut self, gain: f64) -> Self {
        self.gain = Some(gain);
        self
    }

    pub fn with_pan(mut self, pan: f64) -> Self {
        self.pan = Some(pan);
        self
    }

    pub fn with_adsr(mut self, attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        self.attack = Some(attack);
        self.decay = Some(decay);
        self.sustain = Some(sustain);
        self.release = Some(release);
        self
    }

    pub fn with_clip(mut self, clip: f64) -> Self {
        self.clip = Some(clip);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_lpf(mut self, cutoff: f64) -> Self {
        self.lpf = Some(cutoff);
        self
    }

    pub fn with_hpf(mut self, cutoff: f64) -> Self {
        self.hpf = Some(cutoff);
        self
    }

    /// Sound name, defaulting to the triangle oscillator.
    pub fn sound_name(&self) -> &str {
        self.s.as_deref().unwrap_or(DEFAULT_SOUND)
    }

    /// Sample index: `n` rounded to the nearest integer, never negative.
    pub fn index(&self) -> usize {
        self.n.map_or(0, |n| n.round().max(0.0) as usize)
    }

    /// Linear gain clamped to [0, 1].
    pub fn gain(&self) -> f64 {
        self.gain.unwrap_or(DEFAULT_GAIN).clamp(0.0, 1.0)
    }

    /// Pan clamped to [0, 1], centered by default.
    pub fn pan(&self) -> f64 {
        self.pan.unwrap_or(0.5).clamp(0.0, 1.0)
    }

    /// Target pitch as a fractional MIDI number: `note` first, then `freq`.
    pub fn target_midi(&self) -> Option<f64> {
        if let Some(midi) = self.note.as_ref().and_then(NoteValue::to_midi) {
            return Some(midi);
        }
        self.freq
            .filter(|f| *f > 0.0)
            .map(frequency_to_midi)
    }

    /// Oscillator frequency: `note` first, then `freq`.
    pub fn frequency(&self) -> Option<f64> {
        if let Some(midi) = self.note.as_ref().and_then(NoteValue::to_midi) {
            return Some(midi_to_frequency(midi));
        }
        self.freq.filter(|f| *f > 0.0)
    }

    /// Envelope with per-field defaults filled in.
    pub fn adsr(&self) -> Adsr {
        let defaults = Adsr::default();
        Adsr {
            attack: self.attack.unwrap_or(defaults.attack).max(0.0),
            decay: self.decay.unwrap_or(defaults.decay).max(0.0),
            sustain: self.sustain.unwrap_or(defaults.sustain).clamp(0.0, 1.0),
            release: self.release.unwrap_or(defaults.release).max(0.0),
        }
    }

    /// Whether the sample should play its full natural length.
    pub fn clips(&self) -> bool {
        self.clip.is_some_and(|c| c >= 1.0)
    }

    /// Absolute playback speed; zero or unset means 1.
    pub fn playback_speed(&self) -> f64 {
        match self.speed {
            Some(s) if s != 0.0 && s.is_finite() => s.abs(),
            _ => 1.0,
        }
    }

    /// Low-pass cutoff, if set to something positive.
    pub fn lowpass(&self) -> Option<f64> {
        self.lpf.filter(|f| *f > 0.0)
    }

    /// High-pass cutoff, if set to something positive.
    pub fn highpass(&self) -> Option<f64> {
        self.hpf.filter(|f| *f > 0.0)
    }
}

/// A scheduled event, or a fragment of one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hap {
    /// Full extent of the event. `None` for continuous events.
    pub whole: Option<TimeSpan>,
    /// The portion of the event inside the queried window.
    pub part: TimeSpan,
    pub value: HapValue,
}

impl Hap {
    /// A complete (unfragmented) hap.
    pub fn new(begin: f64, end: f64, value: HapValue) -> Self {
        let span = TimeSpan::new(begin, end);
        Hap {
            whole: Some(span),
            part: span,
            value,
        }
    }

    /// A fragment of `whole` restricted to `part`.
    pub fn fragment(whole: TimeSpan, part: TimeSpan, value: HapValue) -> Self {
        Hap {
            whole: Some(whole),
            part,
            value,
        }
    }

    /// The event's true extent, falling back to the fragment.
    pub fn whole_or_part(&self) -> TimeSpan {
        self.whole.unwrap_or(self.part)
    }
}

/// Produces the haps intersecting a window of cycles.
///
/// The renderer queries consecutive, non-overlapping windows in increasing
/// order and treats the result as read-only.
pub trait HapSource {
    fn query_window(&self, begin: f64, end: f64) -> Vec<Hap>;
}

impl<F> HapSource for F
where
    F: Fn(f64, f64) -> Vec<Hap>,
{
    fn query_window(&self, begin: f64, end: f64) -> Vec<Hap> {
        self(begin, end)
    }
}

/// One entry of a scripted event list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedEvent {
    pub begin: f64,
    pub end: f64,
    #[serde(default)]
    pub value: HapValue,
}

/// A fixed list of events, optionally carrying its own tempo and length.
///
/// ```json
/// { "cps": 0.5, "cycles": 4,
///   "events": [ { "begin": 0, "end": 1, "value": { "s": "sine", "note": "c3" } } ] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptedHaps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycles: Option<f64>,
    pub events: Vec<ScriptedEvent>,
}

impl ScriptedHaps {
    pub fn new(events: Vec<ScriptedEvent>) -> Self {
        ScriptedHaps {
            cps: None,
            cycles: None,
            events,
        }
    }

    /// Append an event.
    pub fn push(&mut self, begin: f64, end: f64, value: HapValue) {
        self.events.push(ScriptedEvent { begin, end, value });
    }

    /// Parse either the object form or a bare array of events.
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Form {
            List(ScriptedHaps),
            Bare(Vec<ScriptedEvent>),
        }
        Ok(match serde_json::from_str::<Form>(json)? {
            Form::List(list) => list,
            Form::Bare(events) => ScriptedHaps::new(events),
        })
    }

    /// Load an event list from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|e| RenderError::read_file(path, e))?;
        Self::from_json_str(&text).map_err(|e| RenderError::parse(path, e))
    }

    /// Latest event end, in cycles.
    pub fn end_cycle(&self) -> f64 {
        self.events.iter().map(|e| e.end).fold(0.0, f64::max)
    }
}

impl HapSource for ScriptedHaps {
    fn query_window(&self, begin: f64, end: f64) -> Vec<Hap> {
        let window = TimeSpan::new(begin, end);
        self.events
            .iter()
            .filter_map(|event| {
                let whole = TimeSpan::new(event.begin, event.end);
                whole
                    .intersect(&window)
                    .map(|part| Hap::fragment(whole, part, event.value.clone()))
            })
            .collect()
    }
}
