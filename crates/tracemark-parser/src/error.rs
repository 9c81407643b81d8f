//! Error types for the parser crate
//!
//! Parsing itself never fails: malformed content becomes findings. These
//! errors cover ingress only (discovering and reading files).

use std::path::PathBuf;
use std::time::Duration;
use tracemark_artifact::{ErrorType, ValidationError};

/// Errors while discovering or reading input files
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Configured root does not exist
    #[error("root does not exist: {0}")]
    MissingRoot(PathBuf),

    /// Directory walk could not read an entry
    #[error("cannot read {path}: {message}")]
    Walk { path: PathBuf, message: String },

    /// IO error during file read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File exceeds the size cap
    #[error("file too large: {path} is {size} bytes (max: {max})")]
    TooLarge { path: PathBuf, size: u64, max: u64 },

    /// Read did not finish in time
    #[error("read timed out after {after:?}: {path}")]
    Timeout { path: PathBuf, after: Duration },

    /// File is not valid UTF-8
    #[error("file is not valid UTF-8: {0}")]
    NotUtf8(PathBuf),

    /// Loader task panicked or was cancelled
    #[error("loader task failed: {0}")]
    Task(String),
}

impl ParseError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the whole run must abort
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, ParseError::MissingRoot(_))
    }

    /// Path the error refers to
    #[must_use]
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            ParseError::MissingRoot(path) | ParseError::NotUtf8(path) => Some(path),
            ParseError::Io { path, .. }
            | ParseError::TooLarge { path, .. }
            | ParseError::Timeout { path, .. }
            | ParseError::Walk { path, .. } => Some(path),
            ParseError::Task(_) => None,
        }
    }

    /// Report a per-file failure as a `file` finding
    #[must_use]
    pub fn to_finding(&self) -> ValidationError {
        let path = self.path().cloned().unwrap_or_default();
        ValidationError::new(ErrorType::File, path, self.to_string())
    }
}
