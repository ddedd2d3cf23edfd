//! API error types.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use tubetone_jobs::JobError;
use tubetone_media::MediaError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Body missing, not JSON, or not the expected shape.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Request body too large: {0}")]
    PayloadTooLarge(String),

    /// A request-level failure whose cause is safe to show the client.
    #[error("{message}: {details}")]
    Failed { message: String, details: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn failed(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            details: details.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Failed { .. } | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JobError> for ApiError {
    fn from(e: JobError) -> Self {
        match e {
            JobError::InvalidInput(msg) => ApiError::BadRequest(msg),
            JobError::NotFound(_) => ApiError::not_found("Job not found"),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(e: MediaError) -> Self {
        if e.is_not_found() {
            ApiError::not_found("Video not found")
        } else {
            ApiError::failed("Failed to get video information", e.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(rejection.body_text())
        } else {
            ApiError::InvalidBody(rejection.body_text())
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            ApiError::BadRequest(error) | ApiError::NotFound(error) => ErrorResponse {
                error,
                details: None,
            },
            ApiError::InvalidBody(details) => ErrorResponse {
                error: "Invalid request body".to_string(),
                details: Some(details),
            },
            ApiError::PayloadTooLarge(details) => ErrorResponse {
                error: "Request body too large".to_string(),
                details: Some(details),
            },
            ApiError::Failed { message, details } => ErrorResponse {
                error: message,
                details: Some(details),
            },
            ApiError::Internal(details) => {
                tracing::error!("Internal error: {}", details);
                // Don't expose internal error details in production
                let details = if std::env::var("ENVIRONMENT")
                    .map(|v| v.eq_ignore_ascii_case("production"))
                    .unwrap_or(false)
                {
                    "Please try again later".to_string()
                } else {
                    details
                };
                ErrorResponse {
                    error: "Internal server error".to_string(),
                    details: Some(details),
                }
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_error_mapping() {
        assert!(matches!(
            ApiError::from(JobError::invalid_input("URL is required")),
            ApiError::BadRequest(msg) if msg == "URL is required"
        ));
        assert!(matches!(
            ApiError::from(JobError::not_found("abc")),
            ApiError::NotFound(msg) if msg == "Job not found"
        ));
        assert_eq!(
            ApiError::from(JobError::Duplicate("abc".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_media_error_mapping() {
        let not_found = ApiError::from(MediaError::metadata_not_found("gone"));
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let failed = ApiError::from(MediaError::metadata_failed("boom"));
        assert_eq!(failed.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(failed, ApiError::Failed { message, .. } if message == "Failed to get video information"));
    }
}
