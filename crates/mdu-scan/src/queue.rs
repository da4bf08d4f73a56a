//! FIFO of paths waiting to be measured.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// A single filesystem path awaiting measurement.
///
/// Owned by the queue while pending and moved to exactly one worker on
/// removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTask {
    path: PathBuf,
}

impl PathTask {
    /// Create a task for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path to measure.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take ownership of the path.
    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

/// Unbounded FIFO of [`PathTask`]s.
///
/// Has no locking of its own: it is only ever touched while holding the
/// traversal context's mutex.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: VecDeque<PathTask>,
}

impl TaskQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
        }
    }

    /// Append a task at the tail.
    pub fn push(&mut self, task: PathTask) {
        self.tasks.push_back(task);
    }

    /// Remove the task at the head, if any.
    pub fn pop(&mut self) -> Option<PathTask> {
        self.tasks.pop_front()
    }

    /// Check if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Drop every queued task.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}

impl Extend<PathTask> for TaskQueue {
    fn extend<T: IntoIterator<Item = PathTask>>(&mut self, iter: T) {
        self.tasks.extend(iter);
    }
}
