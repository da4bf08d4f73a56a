//! Traversal progress reporting.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use crate::context::Counters;

/// Progress information during a traversal.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Top-level path being measured.
    pub root: PathBuf,
    /// Number of entries measured so far.
    pub entries_scanned: u64,
    /// Number of directories measured so far.
    pub dirs_scanned: u64,
    /// Allocated bytes accumulated so far.
    pub bytes_scanned: u64,
    /// Number of per-entry failures so far.
    pub errors_count: u64,
    /// Entry most recently measured.
    pub current_path: PathBuf,
    /// Time elapsed since the traversal started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Calculate scan rate in entries per second.
    pub fn entries_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.entries_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Publishes snapshots for one traversal onto the scanner's channel.
#[derive(Debug)]
pub(crate) struct ProgressPublisher<'a> {
    tx: &'a broadcast::Sender<ScanProgress>,
    root: &'a Path,
    start: Instant,
    interval: u64,
}

impl<'a> ProgressPublisher<'a> {
    pub fn new(tx: &'a broadcast::Sender<ScanProgress>, root: &'a Path, interval: u64) -> Self {
        Self {
            tx,
            root,
            start: Instant::now(),
            interval,
        }
    }

    /// Publish if `counters` just crossed an interval boundary.
    pub fn on_measured(&self, counters: Counters, current: &Path) {
        if self.interval > 0 && counters.entries % self.interval == 0 {
            self.publish(counters, current);
        }
    }

    /// Publish unconditionally. Missing receivers are fine.
    pub fn publish(&self, counters: Counters, current: &Path) {
        if self.tx.receiver_count() == 0 {
            return;
        }
        let _ = self.tx.send(ScanProgress {
            root: self.root.to_path_buf(),
            entries_scanned: counters.entries,
            dirs_scanned: counters.directories,
            bytes_scanned: counters.bytes,
            errors_count: counters.errors,
            current_path: current.to_path_buf(),
            elapsed: self.start.elapsed(),
        });
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(entries: u64) -> Counters {
        Counters {
            bytes: entries * 512,
            entries,
            directories: 1,
            errors: 0,
        }
    }

    #[test]
    fn test_publishes_on_interval() {
        let (tx, mut rx) = broadcast::channel(16);
        let publisher = ProgressPublisher::new(&tx, Path::new("root"), 2);

        publisher.on_measured(counters(1), Path::new("root/a"));
        publisher.on_measured(counters(2), Path::new("root/b"));
        publisher.on_measured(counters(3), Path::new("root/c"));

        let progress = rx.try_recv().unwrap();
        assert_eq!(progress.entries_scanned, 2);
        assert_eq!(progress.current_path, PathBuf::from("root/b"));
        assert_eq!(progress.root, PathBuf::from("root"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_zero_interval_disables_periodic() {
        let (tx, mut rx) = broadcast::channel(16);
        let publisher = ProgressPublisher::new(&tx, Path::new("root"), 0);

        publisher.on_measured(counters(1000), Path::new("root/a"));
        assert!(rx.try_recv().is_err());

        publisher.publish(counters(1000), Path::new("root"));
        assert_eq!(rx.try_recv().unwrap().bytes_scanned, 512_000);
    }

    #[test]
    fn test_rate_without_elapsed() {
        let progress = ScanProgress {
            root: PathBuf::new(),
            entries_scanned: 10,
            dirs_scanned: 0,
            bytes_scanned: 0,
            errors_count: 0,
            current_path: PathBuf::new(),
            elapsed: Duration::ZERO,
        };
        assert_eq!(progress.entries_per_second(), 0.0);
    }
}
