//! Error types for imgforge operations.
//!
//! Defines error types for the major subsystems:
//! - Selection validation and strategy dispatch
//! - Safe archive extraction
//! - Result cache backends
//! - Configuration loading
//! - Pipeline run orchestration

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating or dispatching a file selection.
#[derive(Debug, Error)]
pub enum SelectError {
    #[error("Unsupported selection type '{0}'")]
    UnsupportedSelection(String),

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Selection path '{0}' does not exist under the image store")]
    NotFound(String),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised during archive extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Archive cannot be read: {0}")]
    ArchiveRead(String),

    #[error("Archive entry '{entry}' escapes the extraction directory")]
    PathTraversal { entry: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by result cache backends.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache connection failed: {0}")]
    Connection(String),

    #[error("Cache backend error: {0}")]
    Backend(String),
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Invalid(String),
}

/// Terminal failure cause for one pipeline run.
///
/// Wraps the stage-specific errors so the runner can map any failure onto
/// the wire-level [`FailureKind`] taxonomy without losing the message.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Select(#[from] SelectError),

    #[error("Processing failed: {0}")]
    Processing(anyhow::Error),

    #[error("Failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to cache result: {0}")]
    Cache(#[from] CacheError),
}

impl TaskError {
    /// Maps this error onto the failure taxonomy carried by terminal records.
    pub fn kind(&self) -> FailureKind {
        match self {
            TaskError::Select(select) => match select {
                SelectError::UnsupportedSelection(_) => FailureKind::UnsupportedSelection,
                SelectError::InvalidSelection(_) => FailureKind::InvalidSelection,
                SelectError::NotFound(_) => FailureKind::NotFound,
                SelectError::Extract(ExtractError::ArchiveRead(_)) => FailureKind::ArchiveRead,
                SelectError::Extract(ExtractError::PathTraversal { .. }) => {
                    FailureKind::PathTraversal
                }
                SelectError::Extract(ExtractError::Io(_)) => FailureKind::Io,
                SelectError::Io(_) => FailureKind::Io,
            },
            TaskError::Processing(_) => FailureKind::Processing,
            TaskError::Serialize(_) => FailureKind::Serialization,
            TaskError::Cache(_) => FailureKind::Cache,
        }
    }
}

/// Failure categories carried by terminal `FAILURE` records.
///
/// These are wire-visible tags: callers use them to distinguish a
/// bad-request-class error (unsupported or invalid selection) from a
/// security-relevant one (path traversal) or an infrastructure one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnsupportedSelection,
    InvalidSelection,
    ArchiveRead,
    PathTraversal,
    NotFound,
    Io,
    Processing,
    Serialization,
    Cache,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            FailureKind::UnsupportedSelection => "unsupported_selection",
            FailureKind::InvalidSelection => "invalid_selection",
            FailureKind::ArchiveRead => "archive_read",
            FailureKind::PathTraversal => "path_traversal",
            FailureKind::NotFound => "not_found",
            FailureKind::Io => "io",
            FailureKind::Processing => "processing",
            FailureKind::Serialization => "serialization",
            FailureKind::Cache => "cache",
        };
        write!(f, "{}", tag)
    }
}
