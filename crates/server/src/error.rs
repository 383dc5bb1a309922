// crates/server/src/error.rs
use axum::{
    extract::multipart::MultipartError,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::jobs::JobError;
use crate::staging::StagingError;

/// Structured JSON error response for API errors
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Staging(#[from] StagingError),

    #[error(transparent)]
    Job(#[from] JobError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(err.body_text())
        } else {
            ApiError::BadRequest(err.body_text())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::BadRequest(msg) => {
                tracing::warn!(message = %msg, "Bad request");
                (StatusCode::BAD_REQUEST, ErrorResponse::new(msg.clone()))
            }
            ApiError::PayloadTooLarge(msg) => {
                tracing::warn!(message = %msg, "Upload rejected");
                (
                    StatusCode::PAYLOAD_TOO_LARGE,
                    ErrorResponse::with_details("File too large", msg.clone()),
                )
            }
            ApiError::Staging(staging_err) => match staging_err {
                StagingError::InvalidExtension { name } => {
                    tracing::warn!(name = %name, "Rejected non-pptx upload");
                    (
                        StatusCode::BAD_REQUEST,
                        ErrorResponse::with_details(staging_err.to_string(), name.clone()),
                    )
                }
                StagingError::InvalidName { name } => {
                    tracing::warn!(name = %name, "Rejected file name");
                    (
                        StatusCode::BAD_REQUEST,
                        ErrorResponse::new(staging_err.to_string()),
                    )
                }
                StagingError::NotFound { name } => {
                    tracing::warn!(name = %name, "Staged file not found");
                    (
                        StatusCode::NOT_FOUND,
                        ErrorResponse::with_details("File not found", name.clone()),
                    )
                }
                StagingError::Io { path, source } => {
                    tracing::error!(path = %path.display(), error = %source, "Staging IO error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorResponse::new("Internal server error"),
                    )
                }
            },
            ApiError::Job(job_err) => match job_err {
                JobError::InputNotFound { path } => {
                    tracing::warn!(path = %path.display(), "Job input not found");
                    (StatusCode::NOT_FOUND, ErrorResponse::new("File not found"))
                }
                JobError::Spawn(spawn_err) => {
                    tracing::error!(error = %spawn_err, "Processor could not be started");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorResponse::with_details(
                            "Failed to start processor",
                            spawn_err.to_string(),
                        ),
                    )
                }
                JobError::Failed { exit_code, message } => {
                    tracing::warn!(exit_code = ?exit_code, "Processor failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ErrorResponse::new(message.clone()),
                    )
                }
                JobError::TimedOut { after } => {
                    tracing::warn!(timeout_secs = after.as_secs(), "Processor timed out");
                    (
                        StatusCode::GATEWAY_TIMEOUT,
                        ErrorResponse::new(job_err.to_string()),
                    )
                }
            },
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::ProcessorError;
    use axum::body::to_bytes;
    use std::path::PathBuf;
    use std::time::Duration;

    /// Helper to extract status code and body from a response
    async fn extract_response(response: Response) -> (StatusCode, ErrorResponse) {
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error_response: ErrorResponse = serde_json::from_slice(&body).unwrap();
        (status, error_response)
    }

    #[tokio::test]
    async fn test_bad_request_returns_400() {
        let error = ApiError::BadRequest("No file uploaded".to_string());
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "No file uploaded");
        assert!(body.details.is_none());
    }

    #[tokio::test]
    async fn test_invalid_extension_returns_400() {
        let error = ApiError::from(StagingError::InvalidExtension {
            name: "notes.txt".into(),
        });
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Only .pptx files are allowed!");
        assert_eq!(body.details.as_deref(), Some("notes.txt"));
    }

    #[tokio::test]
    async fn test_staging_not_found_returns_404() {
        let error = ApiError::from(StagingError::NotFound {
            name: "1-deck.pptx".into(),
        });
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "File not found");
    }

    #[tokio::test]
    async fn test_staging_io_hides_details() {
        let error = ApiError::from(StagingError::Io {
            path: PathBuf::from("/srv/uploads/secret"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        });
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal server error");
        assert!(body.details.is_none());
    }

    #[tokio::test]
    async fn test_processor_failure_returns_stderr() {
        let error = ApiError::from(JobError::Failed {
            exit_code: Some(1),
            message: "Error: invalid zip".into(),
        });
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Error: invalid zip");
    }

    #[tokio::test]
    async fn test_spawn_failure_returns_500() {
        let error = ApiError::from(JobError::Spawn(ProcessorError::Spawn {
            program: "node".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        }));
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Failed to start processor");
        assert!(body.details.unwrap().contains("node"));
    }

    #[tokio::test]
    async fn test_timeout_returns_504() {
        let error = ApiError::from(JobError::TimedOut {
            after: Duration::from_secs(600),
        });
        let (status, body) = extract_response(error.into_response()).await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(body.error.contains("600"));
    }

    #[tokio::test]
    async fn test_job_input_not_found_returns_404() {
        let error = ApiError::from(JobError::InputNotFound {
            path: PathBuf::from("uploads/1-deck.pptx"),
        });
        let (status, _) = extract_response(error.into_response()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_error_response_skips_missing_details() {
        let json = serde_json::to_string(&ErrorResponse::new("x")).unwrap();
        assert_eq!(json, r#"{"error":"x"}"#);
    }
}
