//! Note names, MIDI numbers and frequencies.
//!
//! Note names follow the pattern-language convention: a letter `a`-`g`
//! (either case), an optional accidental (`#` or `s` for sharp, `b` for
//! flat) and an optional octave, which defaults to 4. C4 is MIDI 60.

/// Frequency of A4 (MIDI 69) in Hz.
pub const A4_FREQUENCY: f64 = 440.0;

/// Fallback MIDI note when a bank carries no pitch information.
pub const DEFAULT_ROOT_MIDI: i32 = 60;

fn letter_semitone(letter: u8) -> Option<i32> {
    match letter.to_ascii_lowercase() {
        b'c' => Some(0),
        b'd' => Some(2),
        b'e' => Some(4),
        b'f' => Some(5),
        b'g' => Some(7),
        b'a' => Some(9),
        b'b' => Some(11),
        _ => None,
    }
}

/// Parse letter, accidental and octave. `default_octave` is used when the
/// octave is missing; `None` makes the octave mandatory.
fn parse_note(note: &str, default_octave: Option<i32>) -> Option<i32> {
    let bytes = note.as_bytes();
    let mut semitone = letter_semitone(*bytes.first()?)?;

    let mut idx = 1;
    match bytes.get(idx) {
        Some(b'#') | Some(b's') => {
            semitone += 1;
            idx += 1;
        }
        Some(b'b') => {
            semitone -= 1;
            idx += 1;
        }
        _ => {}
    }

    let octave_str = &note[idx..];
    let octave = if octave_str.is_empty() {
        default_octave?
    } else {
        octave_str.parse::<i32>().ok()?
    };

    Some((octave + 1) * 12 + semitone)
}

/// Parse a note name (e.g. `"c3"`, `"F#4"`, `"eb2"`, `"cs1"`, `"a"`) into a
/// MIDI note number.
pub fn note_to_midi(note: &str) -> Option<i32> {
    parse_note(note.trim(), Some(4))
}

/// Parse a note key that must carry its octave, as used by bank
/// manifests (`"cs1"`, `"a1"`). Plain indices such as `"0"` are rejected.
pub fn parse_note_key(key: &str) -> Option<i32> {
    parse_note(key, None)
}

/// Root note encoded as a trailing `_<note><octave>` or `-<note><octave>`
/// suffix of a bank name, e.g. `bass_Cs1` → 25.
pub fn parse_note_suffix(name: &str) -> Option<i32> {
    let sep = name.rfind(['_', '-'])?;
    parse_note(&name[sep + 1..], None)
}

/// Convert a (possibly fractional) MIDI note number to Hz.
pub fn midi_to_frequency(midi: f64) -> f64 {
    A4_FREQUENCY * (2.0_f64).powf((midi - 69.0) / 12.0)
}

/// Convert a frequency to a fractional MIDI note number.
pub fn frequency_to_midi(freq: f64) -> f64 {
    69.0 + 12.0 * (freq / A4_FREQUENCY).log2()
}
