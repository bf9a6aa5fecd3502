//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use vpub_publish::{PublishError, RepositoryError};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) | ApiError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Publish(e) => match e {
                PublishError::AnswerNotFound(_) | PublishError::SourceNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                PublishError::PreconditionFailed(_) => StatusCode::CONFLICT,
                PublishError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::Publish(e) => Some(e.kind()),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Publish failures are already phrased for the caller; other internals are not.
        let detail = match &self {
            ApiError::Internal(_) | ApiError::Repository(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "An internal error occurred".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            status: "ERROR",
            detail,
            code: self.code(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpub_models::AnswerId;

    #[test]
    fn test_publish_error_status_mapping() {
        let cases = [
            (PublishError::AnswerNotFound(AnswerId::from("a")), StatusCode::NOT_FOUND),
            (PublishError::precondition("not READY"), StatusCode::CONFLICT),
            (
                PublishError::PayloadTooLarge { size: 2, limit: 1 },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (
                PublishError::ToolUnavailable("ffmpeg".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (PublishError::Timeout(30), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_code(), expected);
        }

        assert_eq!(
            ApiError::internal("publish task failed").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
