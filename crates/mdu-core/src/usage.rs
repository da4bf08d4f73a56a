//! Per-path usage reports and the run-wide status fold.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ScanWarning;

/// Size of the accounting unit reported on output, in bytes.
pub const BLOCK_SIZE: u64 = 512;

/// Convert a byte total to a block count, rounding up.
pub fn blocks_for_bytes(bytes: u64) -> u64 {
    bytes.div_ceil(BLOCK_SIZE)
}

/// Result of measuring one top-level path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskUsage {
    /// The path exactly as it was given.
    pub path: PathBuf,
    /// Allocated storage of the path and everything beneath it, in bytes.
    pub bytes: u64,
    /// Number of entries successfully measured.
    pub entries: u64,
    /// Number of directories among them.
    pub directories: u64,
    /// Number of per-entry failures.
    pub errors: u64,
    /// The failures themselves, unless they were streamed to a handler
    /// while the traversal ran.
    pub warnings: Vec<ScanWarning>,
    /// Wall time of the traversal.
    pub duration: Duration,
}

impl DiskUsage {
    /// Allocated storage in 512-byte blocks.
    pub fn blocks(&self) -> u64 {
        blocks_for_bytes(self.bytes)
    }

    /// Whether any entry under this path failed.
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

/// Sticky success/failure status across several top-level paths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStatus {
    paths: usize,
    failed: bool,
}

impl RunStatus {
    /// Fresh status: nothing measured, nothing failed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one path's outcome into the run.
    pub fn record(&mut self, usage: &DiskUsage) {
        self.paths += 1;
        self.failed |= usage.has_errors();
    }

    /// Number of paths recorded.
    pub fn paths(&self) -> usize {
        self.paths
    }

    /// True when no recorded path had a per-entry failure.
    pub fn is_success(&self) -> bool {
        !self.failed
    }
}
