//! Error types for traversal operations.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fatal errors that stop a traversal before a result is reported.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Invalid configuration (bad worker count, empty path).
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A worker thread could not be created.
    #[error("Failed to start worker {worker}: {source}")]
    WorkerSpawn {
        worker: usize,
        #[source]
        source: std::io::Error,
    },

    /// A worker thread terminated abnormally and could not be joined.
    #[error("Worker {worker} terminated abnormally")]
    WorkerPanicked { worker: usize },
}

impl ScanError {
    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Kind of per-entry warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Metadata for the path could not be read.
    AccessError,
    /// The directory's entries could not be listed.
    ReadError,
}

impl WarningKind {
    /// What could not be done to the path, as printed before it.
    pub fn action(self) -> &'static str {
        match self {
            Self::AccessError => "cannot access",
            Self::ReadError => "cannot read directory",
        }
    }
}

/// Non-fatal failure for a single entry. Traversal continues past it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanWarning {
    /// Path where the failure occurred.
    pub path: PathBuf,
    /// OS description of the failure.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl ScanWarning {
    /// Create a new warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// Metadata lookup failed for `path`.
    pub fn access_error(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self::new(path, os_reason(error), WarningKind::AccessError)
    }

    /// Listing the directory at `path` failed.
    pub fn read_error(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self::new(path, os_reason(error), WarningKind::ReadError)
    }
}

impl fmt::Display for ScanWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}': {}",
            self.kind.action(),
            self.path.display(),
            self.message
        )
    }
}

/// Describe an I/O error the way the C library does, without the
/// ` (os error N)` suffix std appends to raw OS errors.
fn os_reason(error: &std::io::Error) -> String {
    let text = error.to_string();
    if error.raw_os_error().is_some() {
        if let Some((reason, _)) = text.rsplit_once(" (os error ") {
            return reason.to_string();
        }
    }
    text
}
