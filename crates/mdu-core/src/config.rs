//! Scan configuration types.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::ScanError;

/// Configuration for one top-level traversal.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Top-level path to measure, exactly as given by the caller.
    pub root: PathBuf,

    /// Number of parallel workers (must be at least 1).
    #[builder(default = "1")]
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Publish a progress snapshot every N measured entries (0 = never).
    #[builder(default = "1000")]
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_workers() -> usize {
    1
}

fn default_progress_interval() -> u64 {
    1000
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.root {
            Some(ref root) if root.as_os_str().is_empty() => {
                return Err("Root path cannot be empty".to_string());
            }
            Some(_) => {}
            None => return Err("Root path is required".to_string()),
        }
        if self.workers == Some(0) {
            return Err("Worker count must be at least 1".to_string());
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a config with default settings for a single path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            workers: default_workers(),
            progress_interval: default_progress_interval(),
        }
    }

    /// Set the worker count without validating it.
    ///
    /// The scanner calls [`ScanConfig::validate`] before spawning anything,
    /// so an invalid count is still rejected before traversal starts.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Check the invariants the builder enforces, for configs built directly.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.root.as_os_str().is_empty() {
            return Err(ScanError::invalid_config("Root path cannot be empty"));
        }
        if self.workers == 0 {
            return Err(ScanError::invalid_config("Worker count must be at least 1"));
        }
        Ok(())
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}
