//! Error types for web handlers.
//!
//! Every failure leaves the service as `{"message": ..., "severity": "error"}`.
//! Request validation maps to 400; anything raised by the lifecycle maps to
//! 500 with the provider's message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bq_reservations_core::ServiceError;
use bq_reservations_runtime::{CleanupError, ProvisionError};
use serde::Serialize;
use std::fmt;

/// Severity tag carried by every response body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Successful or informational response.
    #[default]
    Info,
    /// Failed request.
    Error,
}

/// Application error type for web handlers.
///
/// Implements Axum's `IntoResponse`, so handlers can return
/// `Result<_, AppError>` and use `?` on lifecycle errors.
///
/// # Examples
///
/// ```ignore
/// async fn handler() -> Result<Json<Body>, AppError> {
///     let log = lifecycle.report(&scope).await?;
///     Ok(Json(body(log)))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String) -> Self {
        Self {
            status,
            message,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message.into())
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message.into())
    }

    /// HTTP status of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// User-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status.as_u16(), self.message)
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
    /// Human-readable error message.
    message: String,
    /// Always [`Severity::Error`].
    severity: Severity,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    message = %self.message,
                    error = %format!("{source:#}"),
                    "Operation failed"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    message = %self.message,
                    "Operation failed"
                );
            }
        } else {
            tracing::warn!(status = %self.status, message = %self.message, "Request rejected");
        }

        let body = ErrorResponse {
            message: self.message,
            severity: Severity::Error,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        Self::internal(err.message().to_string()).with_source(err.into())
    }
}

impl From<CleanupError> for AppError {
    fn from(err: CleanupError) -> Self {
        Self::internal(err.cause.message().to_string()).with_source(err.into())
    }
}

/// The original cause comes first; resources a failed rollback left behind
/// are named after it.
impl From<ProvisionError> for AppError {
    fn from(err: ProvisionError) -> Self {
        let mut message = err.cause.message().to_string();
        if !err.rolled_back_cleanly() {
            let left: Vec<String> = err
                .rollback_failures
                .iter()
                .map(|failure| format!("{} {}", failure.resource, failure.name))
                .collect();
            message.push_str(&format!(
                " (rollback incomplete, left behind: {})",
                left.join(", ")
            ));
        }
        Self::internal(message).with_source(err.into())
    }
}
