//! Run registry tracking the latest status of submitted runs.
//!
//! Each submitted run registers a watch channel here. The registry answers
//! point-in-time status queries and hands out follower channels without
//! touching the running task.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::watch;
use uuid::Uuid;

use crate::pipeline::TaskStatus;

/// Tracks the latest status record of every submitted run.
///
/// Unknown run ids read as `Pending`.
#[derive(Default)]
pub struct RunRegistry {
    runs: RwLock<HashMap<Uuid, watch::Receiver<TaskStatus>>>,
}

impl RunRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a run's status channel under its id.
    pub fn register(&self, run_id: Uuid, receiver: watch::Receiver<TaskStatus>) {
        let mut runs = self.runs.write().expect("run registry lock poisoned");
        runs.insert(run_id, receiver);
    }

    /// Returns the latest published status of a run.
    pub fn status(&self, run_id: &Uuid) -> TaskStatus {
        let runs = self.runs.read().expect("run registry lock poisoned");
        runs.get(run_id)
            .map(|receiver| receiver.borrow().clone())
            .unwrap_or(TaskStatus::Pending)
    }

    /// Returns a follower channel for a run, if the run is known.
    ///
    /// The channel keeps yielding the latest record even after the run's
    /// terminal state has been published.
    pub fn subscribe(&self, run_id: &Uuid) -> Option<watch::Receiver<TaskStatus>> {
        let runs = self.runs.read().expect("run registry lock poisoned");
        runs.get(run_id).cloned()
    }

    /// Drops a run from the registry. Returns whether it was tracked.
    pub fn forget(&self, run_id: &Uuid) -> bool {
        let mut runs = self.runs.write().expect("run registry lock poisoned");
        runs.remove(run_id).is_some()
    }

    /// Removes runs whose terminal record has been published.
    ///
    /// Returns the number of runs removed.
    pub fn purge_terminal(&self) -> usize {
        let mut runs = self.runs.write().expect("run registry lock poisoned");
        let before = runs.len();
        runs.retain(|_, receiver| !receiver.borrow().is_terminal());
        before - runs.len()
    }

    /// Number of tracked runs.
    pub fn len(&self) -> usize {
        let runs = self.runs.read().expect("run registry lock poisoned");
        runs.len()
    }

    /// Returns true when no runs are tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
