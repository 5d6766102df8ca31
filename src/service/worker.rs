//! Run submission service.
//!
//! This module provides the `TaskService` which accepts file selections,
//! spawns one pipeline run per submission, and bounds how many runs
//! execute concurrently. Every run's status channel is registered in the
//! shared [`RunRegistry`] before `submit` returns, so callers can poll or
//! follow a run immediately.

use std::sync::Arc;

use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::FailureKind;
use crate::pipeline::{PipelineRunner, ProgressHandle, TaskStatus, WatchSink};
use crate::select::FileSelection;

use super::registry::RunRegistry;

/// Submission facade over the pipeline runner.
///
/// The service handles:
/// - Assigning a run id to each submitted selection
/// - Registering the run's status channel before it starts
/// - Bounding concurrent runs with the configured limit
pub struct TaskService {
    runner: Arc<PipelineRunner>,
    registry: Arc<RunRegistry>,
    permits: Arc<Semaphore>,
}

impl TaskService {
    /// Creates a service around a runner.
    ///
    /// The concurrency limit is taken from the runner's configuration.
    pub fn new(runner: PipelineRunner) -> Self {
        let max_runs = runner.config().max_concurrent_runs;
        Self {
            runner: Arc::new(runner),
            registry: Arc::new(RunRegistry::new()),
            permits: Arc::new(Semaphore::new(max_runs)),
        }
    }

    /// Returns the registry tracking this service's runs.
    pub fn registry(&self) -> Arc<RunRegistry> {
        Arc::clone(&self.registry)
    }

    /// Number of run slots currently free.
    pub fn available_slots(&self) -> usize {
        self.permits.available_permits()
    }

    /// Submits a selection for processing and returns its run id.
    ///
    /// The run executes on the runtime as soon as a slot frees up; until
    /// then its status reads `Pending`. Submission itself never fails.
    pub fn submit(&self, selection: FileSelection) -> Uuid {
        let run_id = Uuid::new_v4();
        let (sink, receiver) = WatchSink::channel();
        self.registry.register(run_id, receiver);

        let progress = ProgressHandle::new(Arc::new(sink));
        let runner = Arc::clone(&self.runner);
        let permits = Arc::clone(&self.permits);
        info!(run_id = %run_id, task = %selection.name, "run submitted");

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!(run_id = %run_id, "run slot acquisition failed");
                    progress.fail(FailureKind::Processing, "run never acquired a slot");
                    return;
                }
            };
            debug!(run_id = %run_id, "run slot acquired");
            // The runner publishes the terminal record on both paths.
            let _ = runner.run(selection, &progress).await;
        });

        run_id
    }

    /// Returns the latest published status of a run.
    pub fn status(&self, run_id: &Uuid) -> TaskStatus {
        self.registry.status(run_id)
    }

    /// Returns a follower channel for a run, if the run is known.
    pub fn follow(&self, run_id: &Uuid) -> Option<watch::Receiver<TaskStatus>> {
        self.registry.subscribe(run_id)
    }
}
