//! Worker state machine.
//!
//! A worker cycles WAIT -> PROCESS -> WAIT until the context reports
//! quiescence, then moves to EXIT. All filesystem calls happen in PROCESS
//! without holding the context lock.

use std::path::Path;
use std::thread;

use mdu_core::ScanWarning;
use tracing::{debug, trace};

use crate::context::TraversalContext;
use crate::measure::{allocated_bytes, entry_metadata, list_children};
use crate::progress::ProgressPublisher;
use crate::queue::PathTask;

/// Callback receiving each per-entry failure as soon as it happens.
pub type WarningHandler = dyn Fn(&ScanWarning) + Send + Sync;

enum Step {
    Wait,
    Process(PathTask),
    Exit,
}

/// One member of a traversal's worker pool.
pub(crate) struct Worker<'a> {
    id: usize,
    context: &'a TraversalContext,
    progress: &'a ProgressPublisher<'a>,
    on_warning: Option<&'a WarningHandler>,
}

impl<'a> Worker<'a> {
    pub fn new(
        id: usize,
        context: &'a TraversalContext,
        progress: &'a ProgressPublisher<'a>,
        on_warning: Option<&'a WarningHandler>,
    ) -> Self {
        Self {
            id,
            context,
            progress,
            on_warning,
        }
    }

    /// Run until the traversal is complete.
    pub fn run(self) {
        let _guard = AbandonOnPanic(self.context);
        debug!(worker = self.id, "worker started");

        let mut processed = 0u64;
        let mut step = Step::Wait;
        loop {
            step = match step {
                Step::Wait => match self.context.next_task() {
                    Some(task) => Step::Process(task),
                    None => Step::Exit,
                },
                Step::Process(task) => {
                    self.process(&task.into_path());
                    processed += 1;
                    Step::Wait
                }
                Step::Exit => break,
            };
        }

        debug!(worker = self.id, processed, "worker finished");
    }

    /// Measure one path and settle its task.
    fn process(&self, path: &Path) {
        let metadata = match entry_metadata(path) {
            Ok(metadata) => metadata,
            Err(err) => {
                debug!(
                    worker = self.id,
                    path = %path.display(),
                    error = %err,
                    "metadata lookup failed"
                );
                self.fail(ScanWarning::access_error(path, &err));
                return;
            }
        };

        let is_dir = metadata.is_dir();
        let bytes = allocated_bytes(&metadata);
        let counters = self.context.add_storage(bytes, is_dir);
        self.progress.on_measured(counters, path);
        trace!(worker = self.id, path = %path.display(), bytes, is_dir, "measured");

        if !is_dir {
            self.context.resolve();
            return;
        }

        match list_children(path) {
            Ok(children) => {
                trace!(
                    worker = self.id,
                    path = %path.display(),
                    children = children.len(),
                    "expanding"
                );
                self.context.expand(children);
            }
            Err(err) => {
                debug!(
                    worker = self.id,
                    path = %path.display(),
                    error = %err,
                    "directory listing failed"
                );
                self.fail(ScanWarning::read_error(path, &err));
            }
        }
    }

    /// Report a failure outside the lock, then settle it in the context.
    fn fail(&self, warning: ScanWarning) {
        if let Some(on_warning) = self.on_warning {
            on_warning(&warning);
        }
        self.context.fail(warning);
    }
}

/// Releases the rest of the pool if its holder unwinds mid-task, since that
/// task would otherwise never settle.
pub(crate) struct AbandonOnPanic<'a>(pub &'a TraversalContext);

impl Drop for AbandonOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abandon();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::broadcast;

    fn run_single(root: &Path, on_warning: Option<&WarningHandler>) -> crate::TraversalTotals {
        let (tx, _) = broadcast::channel(4);
        let context = TraversalContext::new(root);
        let progress = ProgressPublisher::new(&tx, root, 0);
        Worker::new(0, &context, &progress, on_warning).run();
        assert!(context.is_done());
        context.into_totals()
    }

    #[test]
    fn test_single_worker_walks_tree() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("a.txt"), "hello").unwrap();
        fs::write(temp.path().join("sub/b.txt"), "world").unwrap();

        let totals = run_single(temp.path(), None);

        assert_eq!(totals.counters.entries, 4);
        assert_eq!(totals.counters.directories, 2);
        assert!(!totals.failed);
    }

    #[test]
    fn test_missing_root_records_access_error() {
        let temp = TempDir::new().unwrap();
        let totals = run_single(&temp.path().join("missing"), None);

        assert!(totals.failed);
        assert_eq!(totals.counters.entries, 0);
        assert_eq!(totals.counters.bytes, 0);
        assert_eq!(totals.warnings[0].kind, mdu_core::WarningKind::AccessError);
    }

    #[test]
    fn test_failures_passed_to_handler() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = move |warning: &ScanWarning| sink.lock().push(warning.clone());

        let totals = run_single(&missing, Some(&handler as &WarningHandler));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].path, missing);
        assert_eq!(totals.counters.errors, 1);
    }

    #[test]
    fn test_worker_exits_on_abandoned_context() {
        let (tx, _) = broadcast::channel(4);
        let context = TraversalContext::new("never-measured");
        context.abandon();
        let progress = ProgressPublisher::new(&tx, Path::new("never-measured"), 0);

        Worker::new(0, &context, &progress, None).run();
        assert_eq!(context.counters().entries, 0);
    }

    #[test]
    fn test_panicking_worker_releases_waiters() {
        let context = TraversalContext::new("root");
        // The root is now in flight and the queue is empty.
        context.next_task().unwrap();

        thread::scope(|s| {
            let waiter = s.spawn(|| context.next_task());
            let crashed = s.spawn(|| {
                let _guard = AbandonOnPanic(&context);
                panic!("worker died mid-task");
            });

            assert!(crashed.join().is_err());
            assert!(waiter.join().unwrap().is_none());
        });

        assert!(context.is_abandoned());
        assert_eq!(context.pending(), 1);
    }
}
