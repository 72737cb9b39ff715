//! Error types for web handlers.
//!
//! Bridges [`GenerationError`] and HTTP responses through Axum's
//! `IntoResponse` trait.
//!
//! | Generation error | Status |
//! |------------------|--------|
//! | `InvalidRequest` | 400 Bad Request |
//! | `WorkerFailure` | 502 Bad Gateway |
//! | `PublishFailed`, `Cancelled`, `Released` | 503 Service Unavailable |
//! | `Timeout` | 504 Gateway Timeout |
//! | anything else | 500 Internal Server Error |
//!
//! Errors the caller may retry (`Timeout`, `PublishFailed`) also carry a
//! `Retry-After` header.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use genbridge_core::GenerationError;
use serde::Serialize;
use std::fmt;

/// Seconds suggested in `Retry-After` for retryable failures.
const RETRY_AFTER_SECS: u64 = 5;

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler() -> Result<Json<GeneratedFile>, AppError> {
///     let file = client.generate(file_ids, &requester, &cancel).await?;
///     Ok(Json(file))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Suggested retry delay, sent as `Retry-After`
    retry_after: Option<u64>,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            retry_after: None,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Ask the client to retry after `seconds`.
    #[must_use]
    pub const fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    /// Suggested retry delay in seconds, if any.
    #[must_use]
    pub const fn retry_after(&self) -> Option<u64> {
        self.retry_after
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "BAD_REQUEST".to_string(),
        )
    }

    /// Create a 502 Bad Gateway error.
    #[must_use]
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_GATEWAY,
            message.into(),
            "GENERATION_FAILED".to_string(),
        )
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message.into(),
            "SERVICE_UNAVAILABLE".to_string(),
        )
    }

    /// Create a 504 Gateway Timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::GATEWAY_TIMEOUT,
            message.into(),
            "TIMEOUT".to_string(),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Generation request failed"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Generation request failed"
                ),
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        let mut response = (self.status, Json(body)).into_response();
        if let Some(seconds) = self.retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        let app_error = match &err {
            GenerationError::InvalidRequest(message) => Self::bad_request(message.clone()),
            GenerationError::WorkerFailure(message) => Self::bad_gateway(message.clone()),
            GenerationError::Timeout { .. } => {
                Self::timeout("Generation did not finish in time, please retry")
            }
            GenerationError::PublishFailed(_) => {
                Self::unavailable("Generation service is unavailable, please retry")
            }
            GenerationError::Cancelled(_) | GenerationError::Released(_) => {
                Self::unavailable("Server is shutting down")
            }
            GenerationError::DuplicateRequest(_)
            | GenerationError::NotFound(_)
            | GenerationError::MalformedResponse(_) => {
                Self::internal("An internal error occurred")
            }
        };
        let app_error = if err.is_retryable() {
            app_error.with_retry_after(RETRY_AFTER_SECS)
        } else {
            app_error
        };
        app_error.with_source(anyhow::Error::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genbridge_core::CorrelationId;
    use std::time::Duration;

    #[test]
    fn test_error_display() {
        let err = AppError::bad_request("file_ids is required");
        assert_eq!(err.to_string(), "[BAD_REQUEST] file_ids is required");
    }

    #[test]
    fn test_generation_error_status_mapping() {
        let id = CorrelationId::from("R1");
        let cases = [
            (
                GenerationError::InvalidRequest("empty".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                GenerationError::WorkerFailure("render failed".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                GenerationError::PublishFailed("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                GenerationError::Cancelled(id.clone()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                GenerationError::Released(id.clone()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                GenerationError::Timeout {
                    correlation_id: id.clone(),
                    timeout: Duration::from_secs(1),
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                GenerationError::DuplicateRequest(id),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn test_retryable_errors_suggest_retry_after() {
        let timeout = AppError::from(GenerationError::Timeout {
            correlation_id: CorrelationId::from("R2"),
            timeout: Duration::from_millis(50),
        });
        let publish = AppError::from(GenerationError::PublishFailed("down".into()));
        let worker = AppError::from(GenerationError::WorkerFailure("render failed".into()));

        assert_eq!(timeout.retry_after(), Some(RETRY_AFTER_SECS));
        assert_eq!(publish.retry_after(), Some(RETRY_AFTER_SECS));
        assert_eq!(worker.retry_after(), None);

        let response = timeout.into_response();
        assert_eq!(
            response.headers().get(RETRY_AFTER),
            Some(&HeaderValue::from_static("5"))
        );
        assert!(worker.into_response().headers().get(RETRY_AFTER).is_none());
    }

    #[test]
    fn test_worker_failure_message_is_exposed() {
        let err = AppError::from(GenerationError::WorkerFailure("render failed".into()));
        assert_eq!(err.code(), "GENERATION_FAILED");
        assert_eq!(err.to_string(), "[GENERATION_FAILED] render failed");
    }
}
