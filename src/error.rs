//! Error types for loading, rendering and writing.
//!
//! Only I/O on the sample directory, the event list and the output file is
//! fatal. Per-file decode failures and manifest problems are reported here
//! too, but the loader logs and recovers from them.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The sample directory could not be read.
    #[error("failed to read sample directory '{path}': {source}")]
    SampleDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A sample file could not be decoded.
    #[error("failed to decode sample '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    /// The bank manifest exists but is not valid JSON.
    #[error("failed to parse manifest '{path}': {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An event list or config file could not be read.
    #[error("failed to read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An event list or config file is malformed.
    #[error("failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The rendered file could not be written.
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Render parameters are out of range.
    #[error("invalid render config: {0}")]
    InvalidConfig(String),
}

impl RenderError {
    pub fn sample_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RenderError::SampleDir {
            path: path.into(),
            source,
        }
    }

    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RenderError::ReadFile {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        RenderError::Parse {
            path: path.into(),
            source,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RenderError::Write {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn mock_io_err() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::NotFound, "mock")
    }

    #[test]
    fn sample_dir_display_names_path() {
        let err = RenderError::sample_dir("/samples", mock_io_err());
        let msg = err.to_string();
        assert!(msg.contains("sample directory"), "got: {msg}");
        assert!(msg.contains("/samples"), "got: {msg}");
        assert!(err.source().is_some());
    }

    #[test]
    fn write_display_names_path() {
        let err = RenderError::write("/out/song.wav", mock_io_err());
        let msg = err.to_string();
        assert!(msg.starts_with("failed to write"), "got: {msg}");
        assert!(msg.contains("/out/song.wav"), "got: {msg}");
    }

    #[test]
    fn invalid_config_has_no_source() {
        let err = RenderError::InvalidConfig("cps must be positive".to_string());
        assert_eq!(err.to_string(), "invalid render config: cps must be positive");
        assert!(err.source().is_none());
    }
}
