//! Concurrent disk usage traversal engine for mdu.
//!
//! # Overview
//!
//! `mdu-scan` measures the allocated storage of a path and everything
//! beneath it using a fixed pool of worker threads. The directory tree is
//! discovered while it is being measured, so workers feed each other
//! through a shared queue and the pool detects completion with an
//! in-flight task counter rather than a precomputed task list.
//!
//! - **Task queue** of pending paths, guarded by the traversal context
//! - **Traversal context** holding totals, the pending counter and the
//!   quiescence flag behind one mutex and condition variable
//! - **Workers** that measure, expand directories and settle tasks
//! - **Scanner** that runs one pool per top-level path and reports
//!
//! # Example
//!
//! ```rust,no_run
//! use mdu_scan::{DiskUsageScanner, ScanConfig};
//!
//! let config = ScanConfig::new("/path/to/measure").with_workers(4);
//! let usage = DiskUsageScanner::new().scan(&config).unwrap();
//!
//! println!("{}\t{}", usage.blocks(), usage.path.display());
//! ```

mod context;
mod measure;
mod progress;
mod queue;
mod scanner;
mod worker;

pub use context::{Counters, TraversalContext, TraversalTotals};
pub use progress::ScanProgress;
pub use queue::{PathTask, TaskQueue};
pub use scanner::DiskUsageScanner;

// Re-export core types for convenience
pub use mdu_core::{
    BLOCK_SIZE, DiskUsage, RunStatus, ScanConfig, ScanError, ScanWarning, WarningKind,
    blocks_for_bytes,
};
