//! Filesystem queries performed by workers outside the context lock.

use std::fs;
use std::io;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use mdu_core::BLOCK_SIZE;

use crate::queue::PathTask;

/// Metadata for `path` without following a final symbolic link.
pub fn entry_metadata(path: &Path) -> io::Result<fs::Metadata> {
    fs::symlink_metadata(path)
}

/// Storage actually allocated to the entry, in bytes.
///
/// This is the block count reported by the filesystem, not the logical
/// length, and applies to directories as much as to files.
#[cfg(unix)]
pub fn allocated_bytes(metadata: &fs::Metadata) -> u64 {
    metadata.blocks() * BLOCK_SIZE
}

#[cfg(not(unix))]
pub fn allocated_bytes(metadata: &fs::Metadata) -> u64 {
    // No block count available; round the length up to whole blocks.
    metadata.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

/// List the children of `dir` as tasks, joined onto the directory path.
///
/// The `.` and `..` pseudo-entries are never returned. Any failure while
/// enumerating fails the whole listing.
pub fn list_children(dir: &Path) -> io::Result<Vec<PathTask>> {
    fs::read_dir(dir)?
        .map(|entry| entry.map(|e| PathTask::new(dir.join(e.file_name()))))
        .collect()
}
