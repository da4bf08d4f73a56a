//! Core types for mdu.
//!
//! This crate provides the plain data structures shared by the traversal
//! engine and the command line front end: scan configuration, error and
//! warning types, and per-path usage reports.

mod config;
mod error;
mod usage;

pub use config::{ScanConfig, ScanConfigBuilder};
pub use error::{ScanError, ScanWarning, WarningKind};
pub use usage::{BLOCK_SIZE, DiskUsage, RunStatus, blocks_for_bytes};
