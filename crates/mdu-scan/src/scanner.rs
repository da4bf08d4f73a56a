//! Per-path orchestration of the worker pool.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use mdu_core::{DiskUsage, RunStatus, ScanConfig, ScanError, ScanWarning};
use tokio::sync::broadcast;
use tracing::debug;

use crate::context::TraversalContext;
use crate::progress::{ProgressPublisher, ScanProgress};
use crate::worker::{WarningHandler, Worker};

/// Measures disk usage of a path with a fixed pool of parallel workers.
///
/// Each call to [`scan`](Self::scan) builds a fresh traversal context and
/// worker pool; nothing is shared between top-level paths except the
/// progress channel and the warning handler.
pub struct DiskUsageScanner {
    progress_tx: broadcast::Sender<ScanProgress>,
    on_warning: Option<Arc<WarningHandler>>,
}

impl DiskUsageScanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            progress_tx,
            on_warning: None,
        }
    }

    /// Hand every per-entry failure to `callback` from the worker that hit
    /// it, as soon as it happens.
    ///
    /// Reports then carry only the failure count, not the warnings.
    #[must_use]
    pub fn with_warning_handler<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ScanWarning) + Send + Sync + 'static,
    {
        self.on_warning = Some(Arc::new(callback));
        self
    }

    /// Subscribe to progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Measure one top-level path.
    ///
    /// Per-entry failures are counted in the returned report. An `Err`
    /// means the pool itself failed and no total is available.
    pub fn scan(&self, config: &ScanConfig) -> Result<DiskUsage, ScanError> {
        config.validate()?;

        let on_warning = self.on_warning.as_deref();
        let context = TraversalContext::new(&config.root).keep_warnings(on_warning.is_none());
        let progress =
            ProgressPublisher::new(&self.progress_tx, &config.root, config.progress_interval);

        debug!(path = %config.root.display(), workers = config.workers, "starting traversal");
        spawn_pool(&context, config.workers, |id| {
            Worker::new(id, &context, &progress, on_warning).run();
        })?;

        let totals = context.into_totals();
        progress.publish(totals.counters, &config.root);

        let usage = DiskUsage {
            path: config.root.clone(),
            bytes: totals.counters.bytes,
            entries: totals.counters.entries,
            directories: totals.counters.directories,
            errors: totals.counters.errors,
            warnings: totals.warnings,
            duration: progress.elapsed(),
        };
        debug!(
            path = %usage.path.display(),
            blocks = usage.blocks(),
            entries = usage.entries,
            failed = totals.failed,
            "traversal finished"
        );
        Ok(usage)
    }

    /// Measure each root in turn, handing every report to `emit` as soon as
    /// it is ready, and fold the outcomes into a run status.
    ///
    /// The worker count is checked before anything is traversed. A fatal
    /// error or an error from `emit` stops the run.
    pub fn scan_all<I, P, F, E>(
        &self,
        roots: I,
        workers: usize,
        mut emit: F,
    ) -> Result<RunStatus, E>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
        F: FnMut(&DiskUsage) -> Result<(), E>,
        E: From<ScanError>,
    {
        if workers == 0 {
            return Err(ScanError::invalid_config("Worker count must be at least 1").into());
        }

        let mut status = RunStatus::new();
        for root in roots {
            let config = ScanConfig::new(root).with_workers(workers);
            let usage = self.scan(&config)?;
            status.record(&usage);
            emit(&usage)?;
        }
        Ok(status)
    }
}

impl Default for DiskUsageScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `body(id)` on `workers` named threads and join them all.
///
/// A spawn failure abandons `context` so the threads already started can
/// exit; a thread that panicked is reported after every thread is joined.
fn spawn_pool<F>(context: &TraversalContext, workers: usize, body: F) -> Result<(), ScanError>
where
    F: Fn(usize) + Sync,
{
    let body = &body;
    thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);
        let mut result = Ok(());

        for id in 0..workers {
            let spawned = thread::Builder::new()
                .name(format!("mdu-worker-{id}"))
                .spawn_scoped(scope, move || body(id));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(source) => {
                    context.abandon();
                    result = Err(ScanError::WorkerSpawn { worker: id, source });
                    break;
                }
            }
        }

        for (id, handle) in handles.into_iter().enumerate() {
            if handle.join().is_err() && result.is_ok() {
                result = Err(ScanError::WorkerPanicked { worker: id });
            }
        }
        result
    })
}
