//! Task progress records and the sinks that carry them.
//!
//! Each run owns one progress record that moves `PENDING` → `PROGRESS`
//! (step name, 1-based step number, step total, substep count) → terminal
//! `SUCCESS` or `FAILURE`. The runner emits updates through the
//! [`ProgressSink`] boundary; the worker-pool side decides how they are
//! observed (latest-value watch channel for polling, mpsc stream for
//! callers that need every update).

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::warn;

use crate::error::FailureKind;

/// Step name for the extraction/normalization stage.
pub const STEP_PREPROCESSING: &str = "Preprocessing data";
/// Step name for the downstream processing stage.
pub const STEP_PROCESSING: &str = "Processing data";
/// Step name for the serialization stage.
pub const STEP_SERIALIZING: &str = "Serializing data";
/// Step name for the cache write stage.
pub const STEP_CACHING: &str = "Caching data";
/// Total steps reported per run.
pub const STEP_TOTAL: u32 = 4;

/// Status string carried by successful terminal payloads.
const STATUS_COMPLETE: &str = "complete";

/// One run's progress record as observed on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "UPPERCASE")]
pub enum TaskStatus {
    /// Not started, or unknown run id.
    Pending,
    /// In flight; `step_num` is 1-based and never decreases within a run.
    Progress {
        step: String,
        step_num: u32,
        step_total: u32,
        substeps: u64,
    },
    /// Terminal success payload.
    Success {
        task: String,
        status: String,
        autodownload: bool,
    },
    /// Terminal failure with its taxonomy tag and cause.
    Failure {
        kind: FailureKind,
        message: String,
    },
}

impl TaskStatus {
    /// Builds a `PROGRESS` record with the fixed step total.
    pub fn progress(step: impl Into<String>, step_num: u32, substeps: u64) -> Self {
        TaskStatus::Progress {
            step: step.into(),
            step_num,
            step_total: STEP_TOTAL,
            substeps,
        }
    }

    /// Builds the terminal `SUCCESS` payload. `task` is the raw task
    /// name, not the timestamped result name.
    pub fn success(task: impl Into<String>, autodownload: bool) -> Self {
        TaskStatus::Success {
            task: task.into(),
            status: STATUS_COMPLETE.to_string(),
            autodownload,
        }
    }

    /// Builds the terminal `FAILURE` payload.
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        TaskStatus::Failure {
            kind,
            message: message.into(),
        }
    }

    /// Whether this record ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Success { .. } | TaskStatus::Failure { .. })
    }

    /// The wire name of the state.
    pub fn state_name(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Progress { .. } => "PROGRESS",
            TaskStatus::Success { .. } => "SUCCESS",
            TaskStatus::Failure { .. } => "FAILURE",
        }
    }
}

/// Message-passing boundary between the runner and its observers.
pub trait ProgressSink: Send + Sync {
    /// Delivers one status record. Must not block.
    fn publish(&self, status: TaskStatus);
}

/// Latest-value sink backed by a `tokio::sync::watch` channel.
///
/// Late subscribers observe the most recent record, which matches status
/// polling semantics; intermediate records may be skipped by a slow
/// reader. The receiver keeps the last value even after the run ends.
pub struct WatchSink {
    tx: watch::Sender<TaskStatus>,
}

impl WatchSink {
    /// Creates a sink and its receiver, starting at `PENDING`.
    pub fn channel() -> (Self, watch::Receiver<TaskStatus>) {
        let (tx, rx) = watch::channel(TaskStatus::Pending);
        (Self { tx }, rx)
    }
}

impl ProgressSink for WatchSink {
    fn publish(&self, status: TaskStatus) {
        self.tx.send_replace(status);
    }
}

/// Streaming sink backed by an unbounded mpsc channel.
///
/// Delivers every record in order; useful when the observer needs the
/// full history rather than the latest state.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<TaskStatus>,
}

impl ChannelSink {
    /// Creates a sink and its receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TaskStatus>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn publish(&self, status: TaskStatus) {
        // A dropped receiver just means nobody is watching anymore.
        let _ = self.tx.send(status);
    }
}

/// Run-scoped handle the runner reports through.
///
/// Enforces the monotonic step contract: an update whose `step_num` is
/// lower than one already published is dropped and logged instead of
/// being forwarded.
pub struct ProgressHandle {
    sink: Arc<dyn ProgressSink>,
    last_step: AtomicU32,
}

impl ProgressHandle {
    /// Wraps a sink for one run.
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            sink,
            last_step: AtomicU32::new(0),
        }
    }

    /// Publishes a `PROGRESS` update for `step`.
    pub fn update(&self, step: &str, step_num: u32, substeps: u64) {
        let prev = self.last_step.fetch_max(step_num, Ordering::AcqRel);
        if step_num < prev {
            warn!(
                step,
                step_num,
                last = prev,
                "dropping out-of-order progress update"
            );
            return;
        }
        self.sink.publish(TaskStatus::progress(step, step_num, substeps));
    }

    /// Publishes the terminal `SUCCESS` record.
    pub fn succeed(&self, task: &str, autodownload: bool) {
        self.sink.publish(TaskStatus::success(task, autodownload));
    }

    /// Publishes the terminal `FAILURE` record.
    pub fn fail(&self, kind: FailureKind, message: impl Into<String>) {
        self.sink.publish(TaskStatus::failure(kind, message));
    }
}
