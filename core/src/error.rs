//! Error types for remote reservation service calls.
//!
//! Provider-specific failures (HTTP status codes, Google RPC status names,
//! transport errors) are mapped into [`ServiceError`] at the client boundary.
//! Callers in the runtime only ever see this type.

use thiserror::Error;

/// Errors returned by a [`ReservationService`](crate::ReservationService).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The request was rejected as malformed (bad scope, bad slot count).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The target resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A precondition failed, e.g. deleting a reservation that still has
    /// assignments or a commitment that is still referenced.
    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    /// Slot quota exhausted.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Caller lacks permission on the scope.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Credentials missing or rejected.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Service temporarily unavailable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Network-level failure before a response was received.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// Any other error reported by the API.
    #[error("API error (status {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from API
        message: String,
    },
}

impl ServiceError {
    /// HTTP-equivalent status code for this failure.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidArgument(_) | Self::FailedPrecondition(_) => 400,
            Self::Unauthenticated(_) => 401,
            Self::PermissionDenied(_) => 403,
            Self::NotFound(_) => 404,
            Self::QuotaExceeded(_) => 429,
            Self::ResponseParseFailed(_) => 502,
            Self::Unavailable(_) | Self::Transport(_) => 503,
            Self::Api { status, .. } => *status,
        }
    }

    /// Provider message without the variant prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidArgument(message)
            | Self::NotFound(message)
            | Self::FailedPrecondition(message)
            | Self::QuotaExceeded(message)
            | Self::PermissionDenied(message)
            | Self::Unauthenticated(message)
            | Self::Unavailable(message)
            | Self::Transport(message)
            | Self::ResponseParseFailed(message)
            | Self::Api { message, .. } => message,
        }
    }

    /// Whether the failure is plausibly transient.
    ///
    /// Commitment teardown retries every error regardless; this flag is for
    /// callers that want a narrower predicate.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::FailedPrecondition(_) | Self::Unavailable(_) | Self::Transport(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
