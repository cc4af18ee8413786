//! Sample banks loaded from disk.
//!
//! Layout: every subdirectory of the sample root is a bank, and the `.wav`
//! files inside it (sorted by name) are its indices `0..N`. An optional
//! JSON manifest at the root maps bank names to note-keyed sample lists;
//! the lowest note key becomes the bank's root pitch.
//!
//! ```text
//! samples/
//!   strudel.json        {"piano": {"c2": "...", "c4": "..."}}
//!   piano/  00.wav 01.wav
//!   bass_Cs1/  a.wav
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hound::{SampleFormat, WavReader};
use tracing::{debug, info, warn};

use super::sampler::SampleBuffer;
use crate::error::{RenderError, Result};
use crate::note::{DEFAULT_ROOT_MIDI, parse_note_key, parse_note_suffix};

/// Manifest file looked up in the sample root by default.
pub const DEFAULT_MANIFEST: &str = "strudel.json";

/// A named, indexed set of samples.
///
/// Indices follow file order; a file that failed to decode leaves an empty
/// slot so later indices keep their meaning.
#[derive(Debug, Clone, Default)]
pub struct SampleBank {
    name: String,
    slots: Vec<Option<Arc<SampleBuffer>>>,
}

impl SampleBank {
    pub fn new(name: impl Into<String>, samples: Vec<SampleBuffer>) -> Self {
        SampleBank {
            name: name.into(),
            slots: samples.into_iter().map(|s| Some(Arc::new(s))).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of index slots, including ones whose file failed to load.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of successfully loaded samples.
    pub fn loaded(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// The sample at `index`, or sample 0 when that slot is missing.
    pub fn get(&self, index: usize) -> Option<&Arc<SampleBuffer>> {
        self.slots
            .get(index)
            .and_then(Option::as_ref)
            .or_else(|| self.slots.first().and_then(Option::as_ref))
    }

    pub fn push(&mut self, sample: Option<SampleBuffer>) {
        self.slots.push(sample.map(Arc::new));
    }
}

/// A sample chosen for a hap.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedSample<'a> {
    pub bank: &'a str,
    pub index: usize,
    pub buffer: &'a Arc<SampleBuffer>,
}

/// All banks available to the renderer, plus manifest root notes.
#[derive(Debug, Clone, Default)]
pub struct BankTable {
    banks: HashMap<String, SampleBank>,
    manifest_roots: HashMap<String, i32>,
}

impl BankTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every bank under `dir`, reading roots from [`DEFAULT_MANIFEST`].
    pub fn load(dir: &Path) -> Result<Self> {
        Self::load_with_manifest(dir, DEFAULT_MANIFEST)
    }

    /// Load every bank under `dir` with a custom manifest file name.
    ///
    /// A missing or unreadable `dir` is an error. Unreadable bank folders,
    /// files that fail to decode and a malformed manifest are logged and
    /// skipped.
    pub fn load_with_manifest(dir: &Path, manifest_name: &str) -> Result<Self> {
        let mut table = BankTable::new();

        let manifest_path = dir.join(manifest_name);
        if manifest_path.is_file() {
            match read_manifest_roots(&manifest_path) {
                Ok(roots) => table.manifest_roots = roots,
                Err(e) => warn!(err = %e, "Ignoring sample manifest"),
            }
        }

        let entries = fs::read_dir(dir).map_err(|e| RenderError::sample_dir(dir, e))?;
        let mut bank_dirs: Vec<(String, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| RenderError::sample_dir(dir, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) {
                bank_dirs.push((name, path));
            }
        }
        bank_dirs.sort();

        for (name, path) in bank_dirs {
            let bank = match load_bank(&name, &path) {
                Ok(bank) => bank,
                Err(e) => {
                    warn!(bank = name.as_str(), err = %e, "Skipping unreadable bank");
                    continue;
                }
            };
            if bank.loaded() > 0 {
                table.insert(bank);
            } else {
                debug!(bank = name.as_str(), "No usable samples, skipping bank");
            }
        }

        info!(
            path = ?dir,
            banks = table.banks.len(),
            samples = table.sample_count(),
            manifest_roots = table.manifest_roots.len(),
            "Loaded samples"
        );
        Ok(table)
    }

    /// Add or replace a bank.
    pub fn insert(&mut self, bank: SampleBank) {
        self.banks.insert(bank.name.clone(), bank);
    }

    /// Record a root note for `bank`, taking priority over its name suffix.
    pub fn set_root(&mut self, bank: impl Into<String>, midi: i32) {
        self.manifest_roots.insert(bank.into(), midi);
    }

    pub fn get(&self, bank: &str) -> Option<&SampleBank> {
        self.banks.get(bank)
    }

    pub fn contains(&self, bank: &str) -> bool {
        self.banks.contains_key(bank)
    }

    /// Sample `index` of `bank`, falling back to index 0.
    pub fn lookup(&self, bank: &str, index: usize) -> Option<&Arc<SampleBuffer>> {
        self.banks.get(bank)?.get(index)
    }

    /// Resolve a hap's sound name and index. The sound may be a bank name
    /// or `bank:index`, in which case the embedded index wins.
    pub fn resolve<'a>(&'a self, sound: &str, n: usize) -> Option<ResolvedSample<'a>> {
        let (name, index) = match sound.rsplit_once(':') {
            Some((bank, idx)) if !self.banks.contains_key(sound) => {
                (bank, idx.trim().parse::<usize>().ok()?)
            }
            _ => (sound, n),
        };
        let (bank_name, bank) = self.banks.get_key_value(name)?;
        let buffer = bank.get(index)?;
        Some(ResolvedSample {
            bank: bank_name.as_str(),
            index,
            buffer,
        })
    }

    /// Root MIDI note of `bank`: manifest entry, then name suffix, then C4.
    pub fn root_note(&self, bank: &str) -> i32 {
        self.manifest_roots
            .get(bank)
            .copied()
            .or_else(|| parse_note_suffix(bank))
            .unwrap_or(DEFAULT_ROOT_MIDI)
    }

    /// Bank names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.banks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of banks.
    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }

    /// Total loaded samples across banks.
    pub fn sample_count(&self) -> usize {
        self.banks.values().map(SampleBank::loaded).sum()
    }
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
}

fn load_bank(name: &str, dir: &Path) -> Result<SampleBank> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| RenderError::sample_dir(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_wav(p))
        .collect();
    files.sort();

    let mut bank = SampleBank {
        name: name.to_string(),
        slots: Vec::with_capacity(files.len()),
    };
    for path in files {
        match decode_wav(&path) {
            Ok(buffer) => bank.push(Some(buffer)),
            Err(e) => {
                warn!(bank = name, path = ?path, err = %e, "Skipping sample");
                bank.push(None);
            }
        }
    }
    Ok(bank)
}

/// Decode a WAV file into planar f32 channels.
///
/// Integer PCM is scaled by `2^(bits-1)`. Only the first two channels are
/// kept.
pub fn decode_wav(path: &Path) -> Result<SampleBuffer> {
    let decode_err = |source: hound::Error| RenderError::Decode {
        path: path.to_path_buf(),
        source,
    };
    let reader = WavReader::open(path).map_err(decode_err)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(decode_err)?,
        SampleFormat::Int => {
            let scale = 2.0_f32.powi(spec.bits_per_sample as i32 - 1);
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(decode_err)?
        }
    };

    let mut buffer = SampleBuffer::from_interleaved(&samples, spec.channels as usize, spec.sample_rate);
    if buffer.channel_count() > 2 {
        buffer = SampleBuffer::new(buffer.channels()[..2].to_vec(), spec.sample_rate);
    }
    Ok(buffer)
}

/// Lowest note key per bank. Keys starting with `_` are metadata.
fn read_manifest_roots(path: &Path) -> Result<HashMap<String, i32>> {
    let text = fs::read_to_string(path).map_err(|e| RenderError::read_file(path, e))?;
    let manifest: HashMap<String, serde_json::Value> = serde_json::from_str(&text).map_err(|source| RenderError::Manifest {
        path: path.to_path_buf(),
        source,
    })?;

    let roots = manifest
        .into_iter()
        .filter(|(bank, _)| !bank.starts_with('_'))
        .filter_map(|(bank, mapping)| {
            let root = mapping
                .as_object()?
                .keys()
                .filter_map(|k| parse_note_key(k))
                .min()?;
            Some((bank, root))
        })
        .collect();
    Ok(roots)
}
