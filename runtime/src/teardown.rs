//! The `cleanup` operation: delete every reservation resource in a scope.
//!
//! Order is mandatory: the API rejects deleting a reservation that still has
//! assignments, and a commitment that reservations still draw on.
//!
//! ```text
//! for each reservation:
//!     delete each assignment
//!     delete the reservation
//! delete each commitment   (bounded retry)
//! ```

use crate::inventory::{list_assignments, list_commitments, list_reservations};
use crate::retry::{retry_with_backoff, RetryPolicy};
use bq_reservations_core::{ReservationService, Scope, ServiceError};
use thiserror::Error;

/// A teardown that stopped at its first failed call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cleanup aborted after {} deletion(s): {cause}", completed.len())]
pub struct CleanupError {
    /// Log lines for the deletions that succeeded before the failure.
    pub completed: Vec<String>,
    /// The failing call's error, unchanged.
    #[source]
    pub cause: ServiceError,
}

/// Delete an assignment and describe it.
///
/// # Errors
///
/// Returns the service error unchanged.
pub async fn delete_assignment<S: ReservationService>(
    service: &S,
    name: &str,
) -> Result<String, ServiceError> {
    tracing::info!(assignment = %name, "Deleting assignment");
    service.delete_assignment(name).await?;
    Ok(format!("Deleted assignment {name}"))
}

/// Delete a reservation and describe it.
///
/// # Errors
///
/// Returns the service error unchanged.
pub async fn delete_reservation<S: ReservationService>(
    service: &S,
    name: &str,
) -> Result<String, ServiceError> {
    tracing::info!(reservation = %name, "Deleting reservation");
    service.delete_reservation(name).await?;
    Ok(format!("Deleted reservation {name}"))
}

/// Delete a commitment under `policy` and describe it.
///
/// # Errors
///
/// Returns the last attempt's error once the policy is exhausted.
pub async fn delete_commitment<S: ReservationService>(
    service: &S,
    name: &str,
    policy: &RetryPolicy,
) -> Result<String, ServiceError> {
    tracing::info!(commitment = %name, "Deleting commitment");
    retry_with_backoff(policy, || service.delete_commitment(name)).await?;
    Ok(format!("Deleted commitment {name}"))
}

/// Delete every assignment, reservation and commitment in `scope`.
///
/// Returns one log line per deletion, in the order performed.
///
/// # Errors
///
/// Returns [`CleanupError`] carrying the deletions already performed.
pub async fn cleanup<S: ReservationService>(
    service: &S,
    scope: &Scope,
    commitment_policy: &RetryPolicy,
) -> Result<Vec<String>, CleanupError> {
    let mut log = Vec::new();
    match run(service, scope, commitment_policy, &mut log).await {
        Ok(()) => Ok(log),
        Err(cause) => {
            tracing::error!(
                scope = %scope,
                completed = log.len(),
                error = %cause,
                "Cleanup aborted"
            );
            Err(CleanupError {
                completed: log,
                cause,
            })
        }
    }
}

async fn run<S: ReservationService>(
    service: &S,
    scope: &Scope,
    commitment_policy: &RetryPolicy,
    log: &mut Vec<String>,
) -> Result<(), ServiceError> {
    for reservation in list_reservations(service, scope).await? {
        for assignment in list_assignments(service, &reservation.name).await? {
            log.push(delete_assignment(service, &assignment.name).await?);
        }
        log.push(delete_reservation(service, &reservation.name).await?);
    }

    for commitment in list_commitments(service, scope).await? {
        log.push(delete_commitment(service, &commitment.name, commitment_policy).await?);
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bq_reservations_core::{JobType, Plan};
    use bq_reservations_testing::{Call, InMemoryReservationService, Operation};

    async fn seed(
        service: &InMemoryReservationService,
        scope: &Scope,
        reservations: usize,
        assignments_each: usize,
        commitments: usize,
    ) {
        for r in 0..reservations {
            let reservation = service
                .create_reservation(scope, &format!("res-{r}"), 100)
                .await
                .unwrap();
            for _ in 0..assignments_each {
                service
                    .create_assignment(&reservation.name, &JobType::Query, &scope.assignee())
                    .await
                    .unwrap();
            }
        }
        for _ in 0..commitments {
            service.create_commitment(scope, &Plan::Flex, 100).await.unwrap();
        }
        service.clear_calls();
    }

    #[tokio::test]
    async fn deletes_in_dependency_order_with_exact_counts() {
        let service = InMemoryReservationService::new();
        let scope = Scope::new("p1", "EU");
        seed(&service, &scope, 3, 2, 4).await;

        let log = cleanup(&service, &scope, &RetryPolicy::no_retry()).await.unwrap();

        let calls = service.calls();
        let count = |op: Operation| calls.iter().filter(|c| c.operation() == op).count();
        assert_eq!(count(Operation::DeleteAssignment), 6);
        assert_eq!(count(Operation::DeleteReservation), 3);
        assert_eq!(count(Operation::DeleteCommitment), 4);
        assert_eq!(log.len(), 13);

        // Every assignment of a reservation goes before that reservation, and
        // every reservation goes before any commitment.
        let deletes: Vec<&Call> = calls.iter().filter(|c| !c.is_read()).collect();
        for (index, call) in deletes.iter().enumerate() {
            if let Call::DeleteReservation { name } = call {
                let prefix = format!("{name}/assignments/");
                assert!(deletes[index..].iter().all(|later| match later {
                    Call::DeleteAssignment { name } => !name.starts_with(&prefix),
                    _ => true,
                }));
            }
        }
        let first_commitment = deletes
            .iter()
            .position(|c| matches!(c, Call::DeleteCommitment { .. }))
            .unwrap();
        assert!(deletes[first_commitment..]
            .iter()
            .all(|c| matches!(c, Call::DeleteCommitment { .. })));

        assert_eq!(service.reservation_count(), 0);
        assert_eq!(service.assignment_count(), 0);
        assert_eq!(service.commitment_count(), 0);
    }

    #[tokio::test]
    async fn log_describes_each_deletion() {
        let service = InMemoryReservationService::new();
        let scope = Scope::new("p1", "EU");
        seed(&service, &scope, 1, 1, 1).await;
        let reservation = format!("{}/reservations/res-0", scope.parent());

        let log = cleanup(&service, &scope, &RetryPolicy::no_retry()).await.unwrap();

        assert!(log[0].starts_with(&format!("Deleted assignment {reservation}/assignments/")));
        assert_eq!(log[1], format!("Deleted reservation {reservation}"));
        assert!(log[2].starts_with("Deleted commitment projects/p1/locations/EU/capacityCommitments/"));
    }

    #[tokio::test]
    async fn first_failure_aborts_and_keeps_partial_log() {
        let service = InMemoryReservationService::new();
        let scope = Scope::new("p1", "EU");
        seed(&service, &scope, 2, 1, 1).await;
        service.fail_always(
            Operation::DeleteReservation,
            ServiceError::PermissionDenied("no".to_string()),
        );

        let err = cleanup(&service, &scope, &RetryPolicy::no_retry())
            .await
            .unwrap_err();

        assert_eq!(err.cause, ServiceError::PermissionDenied("no".to_string()));
        assert_eq!(err.completed.len(), 1);
        assert!(err.completed[0].starts_with("Deleted assignment"));
        // Nothing after the failing call was attempted.
        assert!(!service
            .calls()
            .iter()
            .any(|c| c.operation() == Operation::DeleteCommitment));
    }

    #[tokio::test(start_paused = true)]
    async fn commitment_delete_is_retried_once() {
        let service = InMemoryReservationService::new();
        let scope = Scope::new("p1", "EU");
        seed(&service, &scope, 0, 0, 1).await;
        service.fail_times(
            Operation::DeleteCommitment,
            1,
            ServiceError::FailedPrecondition("still referenced".to_string()),
        );

        let log = cleanup(&service, &scope, &RetryPolicy::commitment_teardown())
            .await
            .unwrap();

        assert_eq!(log.len(), 1);
        let attempts = service
            .calls()
            .iter()
            .filter(|c| c.operation() == Operation::DeleteCommitment)
            .count();
        assert_eq!(attempts, 2);
        assert_eq!(service.commitment_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn commitment_delete_gives_up_after_two_attempts() {
        let service = InMemoryReservationService::new();
        let scope = Scope::new("p1", "EU");
        seed(&service, &scope, 0, 0, 1).await;
        service.fail_always(
            Operation::DeleteCommitment,
            ServiceError::FailedPrecondition("still referenced".to_string()),
        );

        let err = cleanup(&service, &scope, &RetryPolicy::commitment_teardown())
            .await
            .unwrap_err();

        assert!(matches!(err.cause, ServiceError::FailedPrecondition(_)));
        assert_eq!(service.commitment_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn commitment_released_after_reservation_delete_settles() {
        let service = InMemoryReservationService::new().with_release_lag(1);
        let scope = Scope::new("p1", "EU");
        seed(&service, &scope, 1, 1, 1).await;

        let log = cleanup(&service, &scope, &RetryPolicy::commitment_teardown())
            .await
            .unwrap();

        assert_eq!(log.len(), 3);
        let attempts = service
            .calls()
            .iter()
            .filter(|c| c.operation() == Operation::DeleteCommitment)
            .count();
        assert_eq!(attempts, 2);
        assert_eq!(service.commitment_count(), 0);
    }

    #[tokio::test]
    async fn unsettled_commitment_fails_without_retry() {
        let service = InMemoryReservationService::new().with_release_lag(1);
        let scope = Scope::new("p1", "EU");
        seed(&service, &scope, 1, 0, 1).await;

        let err = cleanup(&service, &scope, &RetryPolicy::no_retry())
            .await
            .unwrap_err();

        assert!(matches!(err.cause, ServiceError::FailedPrecondition(_)));
        assert_eq!(err.completed.len(), 1);
        assert_eq!(service.reservation_count(), 0);
        assert_eq!(service.commitment_count(), 1);
    }
}
