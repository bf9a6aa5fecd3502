//! Storage error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::retry::Retryable;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Missing storage configuration: {}", .missing.join(", "))]
    MisconfiguredStore { missing: Vec<&'static str> },

    #[error("Local directory not found: {0}")]
    NotFound(PathBuf),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Upload of {key} failed: {last_error}")]
    UploadFailed { key: String, last_error: String },

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn upload_failed(key: impl Into<String>, last_error: impl ToString) -> Self {
        Self::UploadFailed {
            key: key.into(),
            last_error: last_error.to_string(),
        }
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }
}

impl Retryable for StorageError {
    /// Only transient SDK/transport failures are worth another attempt.
    fn is_retryable(&self) -> bool {
        matches!(self, StorageError::Transport(_))
    }
}
