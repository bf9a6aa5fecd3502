//! Publish error types.

use std::path::PathBuf;

use thiserror::Error;
use vpub_media::MediaError;
use vpub_models::AnswerId;
use vpub_storage::StorageError;

use crate::repository::RepositoryError;

pub type PublishResult<T> = Result<T, PublishError>;

/// Terminal outcome of a failed publish attempt.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Answer not found: {0}")]
    AnswerNotFound(AnswerId),

    #[error("Source file not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Source file is {size} bytes, limit is {limit} bytes")]
    PayloadTooLarge { size: u64, limit: u64 },

    #[error("Transcoder unavailable: {0}")]
    ToolUnavailable(String),

    #[error("Transcode failed with exit code {}: {stderr}", .exit_code.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string()))]
    TranscodeFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Object store misconfigured, missing: {}", .missing.join(", "))]
    MisconfiguredStore { missing: Vec<&'static str> },

    #[error("Upload of {key} failed: {last_error}")]
    UploadFailed { key: String, last_error: String },

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl PublishError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::PreconditionFailed(msg.into())
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }

    /// Stable snake_case label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PublishError::AnswerNotFound(_) | PublishError::SourceNotFound(_) => "not_found",
            PublishError::PreconditionFailed(_) => "precondition_failed",
            PublishError::PayloadTooLarge { .. } => "payload_too_large",
            PublishError::ToolUnavailable(_) => "tool_unavailable",
            PublishError::TranscodeFailed { .. } => "transcode_failed",
            PublishError::MisconfiguredStore { .. } => "misconfigured_store",
            PublishError::UploadFailed { .. } => "upload_failed",
            PublishError::InvariantViolation(_) => "invariant_violation",
            PublishError::Timeout(_) => "timeout",
            PublishError::Unexpected(_) => "unexpected",
        }
    }

    /// Whether this failure moves the answer to `ERROR`.
    ///
    /// A missing answer has nothing to update. A wrong status or an oversized
    /// source is a rejected request and leaves the answer as it was.
    pub fn persists_error(&self) -> bool {
        !matches!(
            self,
            PublishError::AnswerNotFound(_)
                | PublishError::PreconditionFailed(_)
                | PublishError::PayloadTooLarge { .. }
        )
    }
}

impl From<MediaError> for PublishError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::ToolNotFound(tool) => PublishError::ToolUnavailable(tool),
            MediaError::FileNotFound(path) => PublishError::SourceNotFound(path),
            MediaError::TranscodeFailed {
                exit_code, stderr, ..
            } => PublishError::TranscodeFailed { exit_code, stderr },
            MediaError::Timeout(secs) => PublishError::Timeout(secs),
            MediaError::Io(e) => PublishError::Unexpected(format!("transcode I/O: {}", e)),
        }
    }
}

impl From<StorageError> for PublishError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::MisconfiguredStore { missing } => {
                PublishError::MisconfiguredStore { missing }
            }
            StorageError::UploadFailed { key, last_error } => {
                PublishError::UploadFailed { key, last_error }
            }
            // The package directory is ours; losing it is a packaging bug.
            StorageError::NotFound(path) => PublishError::InvariantViolation(format!(
                "package directory {} missing before upload",
                path.display()
            )),
            StorageError::InvariantViolation(msg) => PublishError::InvariantViolation(msg),
            other => PublishError::Unexpected(other.to_string()),
        }
    }
}

impl From<RepositoryError> for PublishError {
    fn from(err: RepositoryError) -> Self {
        PublishError::Unexpected(err.to_string())
    }
}

impl From<std::io::Error> for PublishError {
    fn from(err: std::io::Error) -> Self {
        PublishError::Unexpected(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejections_do_not_persist_error() {
        assert!(!PublishError::AnswerNotFound(AnswerId::from("a")).persists_error());
        assert!(!PublishError::precondition("not READY").persists_error());
        assert!(!PublishError::PayloadTooLarge { size: 2, limit: 1 }.persists_error());

        assert!(PublishError::SourceNotFound(PathBuf::from("/media/a.mp4")).persists_error());
        assert!(PublishError::ToolUnavailable("ffmpeg".into()).persists_error());
        assert!(PublishError::Timeout(5).persists_error());
        assert!(PublishError::unexpected("boom").persists_error());
    }

    #[test]
    fn test_media_errors_map_to_stage_kinds() {
        let err: PublishError = MediaError::tool_not_found("ffmpeg").into();
        assert_eq!(err.kind(), "tool_unavailable");

        let err: PublishError = MediaError::transcode_failed(Some(1), b"", b"moov atom not found").into();
        match err {
            PublishError::TranscodeFailed { exit_code, stderr } => {
                assert_eq!(exit_code, Some(1));
                assert!(stderr.contains("moov atom"));
            }
            other => panic!("unexpected mapping: {other:?}"),
        }

        let err: PublishError = MediaError::FileNotFound(PathBuf::from("/x.mp4")).into();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_storage_errors_map_to_upload_kinds() {
        let err: PublishError = StorageError::MisconfiguredStore {
            missing: vec!["CF_R2_KEY", "CF_R2_BUCKET"],
        }
        .into();
        assert_eq!(err.to_string(), "Object store misconfigured, missing: CF_R2_KEY, CF_R2_BUCKET");

        let err: PublishError = StorageError::upload_failed("answers/X/v0_00001.ts", "503").into();
        assert_eq!(err.kind(), "upload_failed");

        let err: PublishError = StorageError::NotFound(PathBuf::from("/tmp/hls_X_abc")).into();
        assert_eq!(err.kind(), "invariant_violation");
    }
}
