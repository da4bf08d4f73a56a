//! Shared state for one top-level traversal and its termination protocol.
//!
//! Every field lives behind a single mutex together with the task queue.
//! `pending` counts tasks that were created but not yet settled; it starts
//! at 1 for the seed. A directory registers its children (push + increment)
//! in the same critical section that retires the directory itself, so the
//! counter can never reach zero while discovered children are unregistered.
//! Quiescence (`pending == 0` with an empty queue) flips `done` and wakes
//! every waiting worker.

use std::path::PathBuf;

use mdu_core::ScanWarning;
use parking_lot::{Condvar, Mutex};

use crate::queue::{PathTask, TaskQueue};

/// Running totals, copied out of the context under its lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Allocated bytes accumulated so far.
    pub bytes: u64,
    /// Entries measured so far.
    pub entries: u64,
    /// Directories among the measured entries.
    pub directories: u64,
    /// Per-entry failures so far.
    pub errors: u64,
}

/// Final state of a traversal, taken once every worker has exited.
#[derive(Debug)]
pub struct TraversalTotals {
    /// Accumulated counters.
    pub counters: Counters,
    /// Sticky error flag.
    pub failed: bool,
    /// Failures in the order they were recorded.
    pub warnings: Vec<ScanWarning>,
}

#[derive(Debug)]
struct State {
    queue: TaskQueue,
    counters: Counters,
    pending: i64,
    done: bool,
    failed: bool,
    abandoned: bool,
    keep_warnings: bool,
    warnings: Vec<ScanWarning>,
}

impl State {
    /// Retire one task and detect quiescence.
    fn settle(&mut self, wake: &Condvar) {
        self.pending -= 1;
        debug_assert!(self.pending >= 0, "pending counter went negative");
        if self.pending == 0 && self.queue.is_empty() {
            self.done = true;
            wake.notify_all();
        }
    }
}

/// Per-invocation traversal state shared by the worker pool.
///
/// Created fresh for each top-level path and never reused.
#[derive(Debug)]
pub struct TraversalContext {
    state: Mutex<State>,
    wake: Condvar,
}

impl TraversalContext {
    /// Create a context seeded with the top-level path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let mut queue = TaskQueue::new();
        queue.push(PathTask::new(root));
        Self {
            state: Mutex::new(State {
                queue,
                counters: Counters::default(),
                pending: 1,
                done: false,
                failed: false,
                abandoned: false,
                keep_warnings: true,
                warnings: Vec::new(),
            }),
            wake: Condvar::new(),
        }
    }

    /// Choose whether failures are kept for the final totals.
    ///
    /// Turned off when warnings are streamed to a handler as they happen;
    /// failures are still counted either way.
    pub fn keep_warnings(self, keep: bool) -> Self {
        self.state.lock().keep_warnings = keep;
        self
    }

    /// Block until a task is available or the traversal is over.
    ///
    /// Returns `None` once the queue is empty and `done` is set, or after
    /// the context was abandoned.
    pub fn next_task(&self) -> Option<PathTask> {
        let mut state = self.state.lock();
        while state.queue.is_empty() && !state.done {
            self.wake.wait(&mut state);
        }
        if state.abandoned {
            return None;
        }
        state.queue.pop()
    }

    /// Add one entry's own allocation to the total.
    pub fn add_storage(&self, bytes: u64, is_dir: bool) -> Counters {
        let mut state = self.state.lock();
        state.counters.bytes += bytes;
        state.counters.entries += 1;
        if is_dir {
            state.counters.directories += 1;
        }
        state.counters
    }

    /// Retire a task whose contribution is fully settled.
    pub fn resolve(&self) {
        self.state.lock().settle(&self.wake);
    }

    /// Record a per-entry failure and retire its task.
    pub fn fail(&self, warning: ScanWarning) {
        let mut state = self.state.lock();
        state.failed = true;
        state.counters.errors += 1;
        if state.keep_warnings {
            state.warnings.push(warning);
        }
        state.settle(&self.wake);
    }

    /// Register a directory's children and retire the directory, atomically.
    pub fn expand(&self, children: Vec<PathTask>) {
        let mut state = self.state.lock();
        if state.abandoned {
            return;
        }
        let added = children.len() as i64;
        state.queue.extend(children);
        state.pending += added;
        state.settle(&self.wake);
        if added > 0 {
            self.wake.notify_all();
        }
    }

    /// Stop the traversal early: drop queued work and release every waiter.
    ///
    /// Used when the pool cannot be fully started or a worker dies.
    pub fn abandon(&self) {
        let mut state = self.state.lock();
        state.abandoned = true;
        state.done = true;
        state.queue.clear();
        self.wake.notify_all();
    }

    /// Current counters.
    pub fn counters(&self) -> Counters {
        self.state.lock().counters
    }

    /// Tasks created but not yet settled.
    pub fn pending(&self) -> i64 {
        self.state.lock().pending
    }

    /// Whether quiescence has been reached.
    pub fn is_done(&self) -> bool {
        self.state.lock().done
    }

    /// Whether the traversal was stopped early.
    pub fn is_abandoned(&self) -> bool {
        self.state.lock().abandoned
    }

    /// Consume the context once all workers have exited.
    pub fn into_totals(self) -> TraversalTotals {
        let state = self.state.into_inner();
        TraversalTotals {
            counters: state.counters,
            failed: state.failed,
            warnings: state.warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdu_core::WarningKind;
    use std::path::Path;
    use std::thread;

    fn children(names: &[&str]) -> Vec<PathTask> {
        names.iter().map(|n| PathTask::new(*n)).collect()
    }

    #[test]
    fn test_seeded_with_root() {
        let ctx = TraversalContext::new("root");
        assert_eq!(ctx.pending(), 1);
        assert!(!ctx.is_done());

        let task = ctx.next_task().unwrap();
        assert_eq!(task.path(), Path::new("root"));
    }

    #[test]
    fn test_single_file_completes() {
        let ctx = TraversalContext::new("file");
        ctx.next_task().unwrap();
        ctx.add_storage(4096, false);
        ctx.resolve();

        assert!(ctx.is_done());
        assert_eq!(ctx.pending(), 0);
        assert!(ctx.next_task().is_none());
        assert_eq!(ctx.into_totals().counters.bytes, 4096);
    }

    #[test]
    fn test_expand_registers_children_before_retiring_parent() {
        let ctx = TraversalContext::new("root");
        ctx.next_task().unwrap();
        ctx.add_storage(4096, true);
        ctx.expand(children(&["root/a", "root/b"]));

        assert_eq!(ctx.pending(), 2);
        assert!(!ctx.is_done());

        let a = ctx.next_task().unwrap();
        assert_eq!(a.path(), Path::new("root/a"));
        ctx.resolve();
        assert!(!ctx.is_done());

        let b = ctx.next_task().unwrap();
        assert_eq!(b.path(), Path::new("root/b"));
        ctx.resolve();
        assert!(ctx.is_done());
        assert!(ctx.next_task().is_none());
    }

    #[test]
    fn test_empty_directory_completes() {
        let ctx = TraversalContext::new("empty");
        ctx.next_task().unwrap();
        ctx.add_storage(4096, true);
        ctx.expand(Vec::new());

        assert!(ctx.is_done());
        let totals = ctx.into_totals();
        assert_eq!(totals.counters.directories, 1);
        assert!(!totals.failed);
    }

    #[test]
    fn test_failure_is_sticky_and_settles() {
        let ctx = TraversalContext::new("root");
        ctx.next_task().unwrap();
        ctx.add_storage(4096, true);
        ctx.expand(children(&["root/gone", "root/ok"]));

        ctx.next_task().unwrap();
        ctx.fail(ScanWarning::new(
            "root/gone",
            "No such file or directory",
            WarningKind::AccessError,
        ));
        ctx.next_task().unwrap();
        ctx.add_storage(512, false);
        ctx.resolve();

        assert!(ctx.is_done());
        let totals = ctx.into_totals();
        assert!(totals.failed);
        assert_eq!(totals.counters.errors, 1);
        assert_eq!(totals.counters.bytes, 4608);
        assert_eq!(totals.warnings.len(), 1);
    }

    #[test]
    fn test_unkept_warnings_still_counted() {
        let ctx = TraversalContext::new("gone").keep_warnings(false);
        ctx.next_task().unwrap();
        ctx.fail(ScanWarning::new(
            "gone",
            "No such file or directory",
            WarningKind::AccessError,
        ));

        assert!(ctx.is_done());
        let totals = ctx.into_totals();
        assert!(totals.failed);
        assert_eq!(totals.counters.errors, 1);
        assert!(totals.warnings.is_empty());
    }

    #[test]
    fn test_waiter_woken_by_expand() {
        let ctx = TraversalContext::new("root");
        ctx.next_task().unwrap();

        thread::scope(|s| {
            let waiter = s.spawn(|| {
                let task = ctx.next_task();
                if task.is_some() {
                    ctx.resolve();
                }
                task
            });

            ctx.add_storage(4096, true);
            ctx.expand(children(&["root/child"]));

            let got = waiter.join().unwrap();
            assert_eq!(got.unwrap().path(), Path::new("root/child"));
        });

        assert!(ctx.is_done());
    }

    #[test]
    fn test_waiters_released_on_completion() {
        let ctx = TraversalContext::new("root");
        ctx.next_task().unwrap();

        thread::scope(|s| {
            let waiters: Vec<_> = (0..4).map(|_| s.spawn(|| ctx.next_task())).collect();
            ctx.add_storage(0, false);
            ctx.resolve();
            for waiter in waiters {
                assert!(waiter.join().unwrap().is_none());
            }
        });
    }

    #[test]
    fn test_abandon_releases_waiters_and_drops_work() {
        let ctx = TraversalContext::new("root");
        ctx.next_task().unwrap();
        ctx.expand(children(&["root/a", "root/b"]));

        ctx.abandon();
        assert!(ctx.is_abandoned());
        assert!(ctx.next_task().is_none());

        // Late expansions from in-flight workers are ignored.
        ctx.expand(children(&["root/a/x"]));
        assert!(ctx.next_task().is_none());
    }
}
