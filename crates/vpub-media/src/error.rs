//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{0} not found in PATH")]
    ToolNotFound(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Transcode failed with exit code {}", .exit_code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()))]
    TranscodeFailed {
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create a transcode failure error from captured process output.
    pub fn transcode_failed(exit_code: Option<i32>, stdout: &[u8], stderr: &[u8]) -> Self {
        Self::TranscodeFailed {
            exit_code,
            stdout: String::from_utf8_lossy(stdout).into_owned(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
        }
    }

    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        Self::ToolNotFound(tool.into())
    }
}
