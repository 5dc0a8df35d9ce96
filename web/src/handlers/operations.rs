//! The lifecycle endpoint.
//!
//! ```text
//! POST /
//! {"project_id": "p1", "location": "EU", "slots": 100, "operation": "purchase"}
//! ```
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. body is a JSON object, else 400 `json request is required`
//! 2. `project_id` is present, else 400
//! 3. `operation` is present, else 200 listing the available operations
//! 4. `operation` is known, else 400 `Unsupported operation '<op>'`
//! 5. field types (`project_id`, `location`, and `slots` for purchase), else 400
//!
//! Only then is a remote call made.

use crate::error::{AppError, Severity};
use crate::extractors::CorrelationId;
use crate::state::{AppState, Defaults};
use crate::WebResult;
use axum::{body::Bytes, extract::State, Json};
use bq_reservations_core::{ReservationService, Scope};
use bq_reservations_runtime::PurchaseRequest;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

const JSON_REQUIRED: &str = "json request is required";
const PROJECT_REQUIRED: &str = "project_id is required in the json request";
const AVAILABLE_OPERATIONS: &str = "Available operations are 'report', 'cleanup' and 'purchase'";

/// A lifecycle operation selected by the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// List reservations, assignments and commitments.
    Report,
    /// Delete all of them.
    Cleanup,
    /// Buy and wire up new capacity.
    Purchase,
}

impl Operation {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "report" => Some(Self::Report),
            "cleanup" => Some(Self::Cleanup),
            "purchase" => Some(Self::Purchase),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Report => "report",
            Self::Cleanup => "cleanup",
            Self::Purchase => "purchase",
        })
    }
}

/// A validated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleRequest {
    /// No operation given.
    Help,
    /// Run the report.
    Report(Scope),
    /// Run the cleanup.
    Cleanup(Scope),
    /// Purchase `slots` slots.
    Purchase {
        /// Target scope.
        scope: Scope,
        /// Slots to purchase.
        slots: u64,
    },
}

/// Successful response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationResponse {
    /// Human-readable outcome.
    pub message: String,
    /// Report or cleanup log lines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<Vec<String>>,
    /// Purchased commitment name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commitment: Option<String>,
    /// Created reservation name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation: Option<String>,
    /// Created assignment name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment: Option<String>,
    /// Always `info`.
    pub severity: Severity,
}

impl OperationResponse {
    fn info(message: String) -> Self {
        Self {
            message,
            severity: Severity::Info,
            ..Self::default()
        }
    }
}

/// Validate a raw request body.
///
/// # Errors
///
/// Returns a 400 [`AppError`] for the first failed check.
pub fn parse_request(body: &[u8], defaults: &Defaults) -> Result<LifecycleRequest, AppError> {
    let data: Map<String, Value> =
        serde_json::from_slice(body).map_err(|_| AppError::bad_request(JSON_REQUIRED))?;

    let project = data
        .get("project_id")
        .ok_or_else(|| AppError::bad_request(PROJECT_REQUIRED))?;

    let operation = match data.get("operation") {
        None | Some(Value::Null) => return Ok(LifecycleRequest::Help),
        Some(Value::String(op)) => {
            Operation::parse(op).ok_or_else(|| unsupported(op))?
        }
        Some(other) => return Err(unsupported(&other.to_string())),
    };

    let project = non_empty_string(project, "project_id")?;
    let location = match data.get("location") {
        None | Some(Value::Null) => defaults.location.clone(),
        Some(value) => non_empty_string(value, "location")?,
    };
    let scope = Scope::new(project, location);

    Ok(match operation {
        Operation::Report => LifecycleRequest::Report(scope),
        Operation::Cleanup => LifecycleRequest::Cleanup(scope),
        Operation::Purchase => LifecycleRequest::Purchase {
            scope,
            slots: slots(data.get("slots"), defaults.slots)?,
        },
    })
}

fn unsupported(op: &str) -> AppError {
    AppError::bad_request(format!("Unsupported operation '{op}'"))
}

fn non_empty_string(value: &Value, field: &str) -> Result<String, AppError> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(AppError::bad_request(format!(
            "{field} must be a non-empty string"
        ))),
    }
}

/// Slots may be a JSON integer or a decimal string; either way positive.
fn slots(value: Option<&Value>, default: u64) -> Result<u64, AppError> {
    let parsed = match value {
        None | Some(Value::Null) => Some(default),
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        Some(_) => None,
    };
    parsed
        .filter(|&n| n > 0)
        .ok_or_else(|| AppError::bad_request("slots must be a positive integer"))
}

/// `POST /`
///
/// # Errors
///
/// 400 for invalid requests, 500 for any failure of the operation itself.
pub async fn dispatch<S>(
    State(state): State<AppState<S>>,
    correlation_id: CorrelationId,
    body: Bytes,
) -> WebResult<Json<OperationResponse>>
where
    S: ReservationService + Clone + 'static,
{
    let request = parse_request(&body, state.defaults())?;
    let lifecycle = state.lifecycle();

    let response = match request {
        LifecycleRequest::Help => OperationResponse::info(AVAILABLE_OPERATIONS.to_string()),
        LifecycleRequest::Report(scope) => {
            let log = lifecycle.report(&scope).await?;
            let message = format!(
                "Successfully ran report in {} for project {}",
                scope.location(),
                scope.project()
            );
            tracing::info!(correlation_id = %correlation_id.0, scope = %scope, lines = log.len(), "{message}");
            OperationResponse {
                log: Some(log),
                ..OperationResponse::info(message)
            }
        }
        LifecycleRequest::Cleanup(scope) => {
            let log = lifecycle.cleanup(&scope).await?;
            let message = format!(
                "Successfully ran cleanup in project {} located in {}",
                scope.project(),
                scope.location()
            );
            tracing::info!(correlation_id = %correlation_id.0, scope = %scope, deleted = log.len(), "{message}");
            OperationResponse {
                log: Some(log),
                ..OperationResponse::info(message)
            }
        }
        LifecycleRequest::Purchase { scope, slots } => {
            let provisioned = lifecycle
                .purchase(&PurchaseRequest::new(scope.clone(), slots))
                .await?;
            let message = format!(
                "Successfully purchased commitment for {slots} slots in project {} located in {}",
                scope.project(),
                scope.location()
            );
            tracing::info!(
                correlation_id = %correlation_id.0,
                commitment = %provisioned.commitment.name,
                reservation = %provisioned.reservation.name,
                assignment = %provisioned.assignment.name,
                "{message}"
            );
            OperationResponse {
                commitment: Some(provisioned.commitment.name),
                reservation: Some(provisioned.reservation.name),
                assignment: Some(provisioned.assignment.name),
                ..OperationResponse::info(message)
            }
        }
    };

    Ok(Json(response))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn parse(body: &str) -> Result<LifecycleRequest, AppError> {
        parse_request(body.as_bytes(), &Defaults::default())
    }

    fn rejected(body: &str) -> String {
        let err = parse(body).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        err.message().to_string()
    }

    #[test]
    fn non_json_and_non_object_bodies_are_rejected() {
        assert_eq!(rejected(""), JSON_REQUIRED);
        assert_eq!(rejected("not json"), JSON_REQUIRED);
        assert_eq!(rejected("[1, 2]"), JSON_REQUIRED);
    }

    #[test]
    fn project_id_checked_before_everything_else() {
        assert_eq!(rejected("{}"), PROJECT_REQUIRED);
        assert_eq!(rejected(r#"{"operation":"bogus","slots":-1}"#), PROJECT_REQUIRED);
    }

    #[test]
    fn missing_operation_is_help() {
        assert_eq!(parse(r#"{"project_id":"p1"}"#).unwrap(), LifecycleRequest::Help);
        assert_eq!(
            parse(r#"{"project_id":"p1","operation":null}"#).unwrap(),
            LifecycleRequest::Help
        );
    }

    #[test]
    fn unknown_operation_is_named() {
        assert_eq!(
            rejected(r#"{"project_id":"p1","operation":"bogus"}"#),
            "Unsupported operation 'bogus'"
        );
        assert_eq!(
            rejected(r#"{"project_id":"p1","operation":7}"#),
            "Unsupported operation '7'"
        );
    }

    #[test]
    fn location_and_slots_default() {
        assert_eq!(
            parse(r#"{"project_id":"p1","operation":"purchase"}"#).unwrap(),
            LifecycleRequest::Purchase {
                scope: Scope::new("p1", "EU"),
                slots: 100,
            }
        );
        assert_eq!(
            parse(r#"{"project_id":"p1","location":"US","operation":"report"}"#).unwrap(),
            LifecycleRequest::Report(Scope::new("p1", "US"))
        );
    }

    #[test]
    fn slots_accept_integer_strings() {
        assert_eq!(
            parse(r#"{"project_id":"p1","operation":"purchase","slots":"50"}"#).unwrap(),
            LifecycleRequest::Purchase {
                scope: Scope::new("p1", "EU"),
                slots: 50,
            }
        );
    }

    #[test]
    fn malformed_fields_are_rejected() {
        for body in [
            r#"{"project_id":"p1","operation":"purchase","slots":0}"#,
            r#"{"project_id":"p1","operation":"purchase","slots":-5}"#,
            r#"{"project_id":"p1","operation":"purchase","slots":1.5}"#,
            r#"{"project_id":"p1","operation":"purchase","slots":"lots"}"#,
        ] {
            assert_eq!(rejected(body), "slots must be a positive integer");
        }
        assert_eq!(
            rejected(r#"{"project_id":42,"operation":"report"}"#),
            "project_id must be a non-empty string"
        );
        assert_eq!(
            rejected(r#"{"project_id":"p1","location":"","operation":"cleanup"}"#),
            "location must be a non-empty string"
        );
    }

    #[test]
    fn slots_ignored_outside_purchase() {
        assert_eq!(
            parse(r#"{"project_id":"p1","operation":"cleanup","slots":"lots"}"#).unwrap(),
            LifecycleRequest::Cleanup(Scope::new("p1", "EU"))
        );
    }

    #[test]
    fn help_response_has_no_resource_fields() {
        let body = serde_json::to_value(OperationResponse::info(AVAILABLE_OPERATIONS.to_string()))
            .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"message": AVAILABLE_OPERATIONS, "severity": "info"})
        );
    }
}
