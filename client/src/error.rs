//! Mapping of Reservation API failures into [`ServiceError`].
//!
//! Google APIs return `{"error": {"code", "message", "status"}}`. The RPC
//! `status` name is more precise than the HTTP code, so it wins when present.

use bq_reservations_core::ServiceError;
use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Map a non-success response into a [`ServiceError`].
///
/// Unparseable bodies fall back to the raw text as the message.
#[must_use]
pub fn from_response(status: StatusCode, body: &str) -> ServiceError {
    let (message, rpc_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (body.trim().to_string(), None),
    };

    if let Some(err) = rpc_status.as_deref().and_then(|s| from_rpc_status(s, &message)) {
        return err;
    }

    match status {
        StatusCode::BAD_REQUEST => ServiceError::InvalidArgument(message),
        StatusCode::UNAUTHORIZED => ServiceError::Unauthenticated(message),
        StatusCode::FORBIDDEN => ServiceError::PermissionDenied(message),
        StatusCode::NOT_FOUND => ServiceError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => ServiceError::QuotaExceeded(message),
        StatusCode::SERVICE_UNAVAILABLE => ServiceError::Unavailable(message),
        status => ServiceError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

fn from_rpc_status(status: &str, message: &str) -> Option<ServiceError> {
    let message = message.to_string();
    Some(match status {
        "INVALID_ARGUMENT" | "OUT_OF_RANGE" => ServiceError::InvalidArgument(message),
        "NOT_FOUND" => ServiceError::NotFound(message),
        "FAILED_PRECONDITION" => ServiceError::FailedPrecondition(message),
        "RESOURCE_EXHAUSTED" => ServiceError::QuotaExceeded(message),
        "PERMISSION_DENIED" => ServiceError::PermissionDenied(message),
        "UNAUTHENTICATED" => ServiceError::Unauthenticated(message),
        "UNAVAILABLE" => ServiceError::Unavailable(message),
        _ => return None,
    })
}

/// Map a transport failure.
#[must_use]
pub fn from_transport(err: &reqwest::Error) -> ServiceError {
    ServiceError::Transport(err.to_string())
}

/// Map a body decoding failure.
#[must_use]
pub fn from_decode(err: &reqwest::Error) -> ServiceError {
    ServiceError::ResponseParseFailed(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_status_wins_over_http_code() {
        let body = r#"{"error":{"code":400,"message":"has assignments","status":"FAILED_PRECONDITION"}}"#;
        assert_eq!(
            from_response(StatusCode::BAD_REQUEST, body),
            ServiceError::FailedPrecondition("has assignments".to_string())
        );
    }

    #[test]
    fn http_code_used_without_rpc_status() {
        assert_eq!(
            from_response(StatusCode::NOT_FOUND, "gone"),
            ServiceError::NotFound("gone".to_string())
        );
        assert_eq!(
            from_response(StatusCode::TOO_MANY_REQUESTS, r#"{"error":{"message":"slow down"}}"#),
            ServiceError::QuotaExceeded("slow down".to_string())
        );
    }

    #[test]
    fn unknown_status_keeps_code() {
        let body = r#"{"error":{"code":409,"message":"exists","status":"ALREADY_EXISTS"}}"#;
        assert_eq!(
            from_response(StatusCode::CONFLICT, body),
            ServiceError::Api {
                status: 409,
                message: "exists".to_string()
            }
        );
    }
}
