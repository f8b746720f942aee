//! Custom error types for Trackbook
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions. The snapshot-specific variants mirror the
//! failure taxonomy of the backup subsystem: codec failures, schema gating,
//! cloud availability and rollback escalation.

use thiserror::Error;

/// The main error type for Trackbook operations
#[derive(Error, Debug)]
pub enum TrackbookError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Bytes do not decode to a snapshot document
    #[error("Malformed snapshot document: {0}")]
    MalformedDocument(String),

    /// The snapshot document has no metadata block
    #[error("Snapshot document is missing its metadata block")]
    MissingMetadata,

    /// Incoming snapshot was produced by a newer schema than this build understands
    #[error("Incompatible snapshot schema: this version understands up to v{current}, snapshot is v{incoming}")]
    IncompatibleSchema { current: u32, incoming: u32 },

    /// The synchronized cloud folder is not available
    #[error("Cloud storage unavailable: {0}")]
    CloudUnavailable(String),

    /// Import failed and restoring the safety snapshot failed as well
    #[error("Rollback failed, data may be inconsistent (original failure: {original}; rollback failure: {rollback})")]
    RollbackFailed { original: String, rollback: String },

    /// Another exclusive operation is already running against the dataset
    #[error("Dataset is busy: {0}")]
    Busy(String),

    /// The deferred-task facility rejected a request
    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

impl TrackbookError {
    /// Create a "not found" error for backups
    pub fn backup_not_found(identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Backup",
            identifier: identifier.into(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if retrying the same operation later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CloudUnavailable(_) | Self::Busy(_) | Self::Io(_))
    }

    /// The only condition where live data may have been lost
    pub fn is_data_loss_risk(&self) -> bool {
        matches!(self, Self::RollbackFailed { .. })
    }
}

impl From<std::io::Error> for TrackbookError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TrackbookError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type alias for Trackbook operations
pub type TrackbookResult<T> = Result<T, TrackbookError>;
