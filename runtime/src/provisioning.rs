//! The `purchase` operation: a provisioning transaction with compensating
//! rollback.
//!
//! ```text
//! Start ──create commitment──► CommitmentCreated
//!   │ (fail: nothing to undo)        │
//!   ▼                                ├──create reservation──► ReservationCreated
//!  Err                               │   (fail) ─────────┐          │
//!                                    │                   │          ├──create assignment──► Provisioned
//!                                    │                   │          │   (fail) ──► delete reservation ─┐
//!                                    │                   ▼          ▼                                  │
//!                                    └──────────── delete commitment ◄─────────────────────────────────┘
//!                                                        │
//!                                                        ▼
//!                                               Err(original cause)
//! ```
//!
//! Compensating deletes are attempted once (commitment deletes go through
//! the commitment retry policy). Their failures are logged and attached to
//! the returned [`ProvisionError`]; the original cause is always the one
//! reported.

use crate::retry::{retry_with_backoff, RetryPolicy};
use bq_reservations_core::environment::Clock;
use bq_reservations_core::naming::reservation_id;
use bq_reservations_core::{
    Assignment, Commitment, JobType, Plan, Reservation, ReservationService, ResourceKind, Scope,
    ServiceError,
};
use std::fmt;
use thiserror::Error;

/// What to purchase and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseRequest {
    /// Target scope.
    pub scope: Scope,
    /// Slots to purchase and reserve.
    pub slots: u64,
    /// Commitment plan.
    pub plan: Plan,
    /// Job type routed by the assignment.
    pub job_type: JobType,
}

impl PurchaseRequest {
    /// `slots` FLEX slots for QUERY jobs in `scope`.
    #[must_use]
    pub fn new(scope: Scope, slots: u64) -> Self {
        Self {
            scope,
            slots,
            plan: Plan::default(),
            job_type: JobType::default(),
        }
    }

    /// Override the commitment plan.
    #[must_use]
    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plan = plan;
        self
    }

    /// Override the assignment job type.
    #[must_use]
    pub fn with_job_type(mut self, job_type: JobType) -> Self {
        self.job_type = job_type;
        self
    }
}

/// The three resources of a committed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    /// Purchased commitment.
    pub commitment: Commitment,
    /// Reservation drawing on it.
    pub reservation: Reservation,
    /// Assignment binding the project to the reservation.
    pub assignment: Assignment,
}

/// Step at which a transaction failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    /// Purchasing the commitment.
    Commitment,
    /// Creating the reservation.
    Reservation,
    /// Creating the assignment.
    Assignment,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Commitment => "commitment purchase",
            Self::Reservation => "reservation creation",
            Self::Assignment => "assignment creation",
        })
    }
}

/// A compensating delete that itself failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackFailure {
    /// Kind of the resource left behind.
    pub resource: ResourceKind,
    /// Its full name.
    pub name: String,
    /// Why the delete failed.
    pub error: ServiceError,
}

impl fmt::Display for RollbackFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} was not deleted: {}", self.resource, self.name, self.error)
    }
}

/// A failed provisioning transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{step} failed: {cause}")]
pub struct ProvisionError {
    /// Where the transaction failed.
    pub step: ProvisionStep,
    /// The failing call's error, unchanged.
    #[source]
    pub cause: ServiceError,
    /// Compensating deletes that did not succeed. Empty when the scope was
    /// restored.
    pub rollback_failures: Vec<RollbackFailure>,
}

impl ProvisionError {
    const fn new(step: ProvisionStep, cause: ServiceError) -> Self {
        Self {
            step,
            cause,
            rollback_failures: Vec::new(),
        }
    }

    /// Whether every partially created resource was removed.
    #[must_use]
    pub fn rolled_back_cleanly(&self) -> bool {
        self.rollback_failures.is_empty()
    }
}

/// Purchase a commitment and wire it into a reservation and an assignment.
///
/// # Errors
///
/// Returns [`ProvisionError`] with the original cause after rolling back
/// whatever was created.
pub async fn purchase<S: ReservationService>(
    service: &S,
    clock: &dyn Clock,
    request: &PurchaseRequest,
    commitment_policy: &RetryPolicy,
) -> Result<Provisioned, ProvisionError> {
    let scope = &request.scope;
    tracing::info!(
        scope = %scope,
        slots = request.slots,
        plan = %request.plan,
        "Purchasing commitment"
    );

    let commitment = service
        .create_commitment(scope, &request.plan, request.slots)
        .await
        .map_err(|cause| ProvisionError::new(ProvisionStep::Commitment, cause))?;
    tracing::info!(commitment = %commitment.name, slots = commitment.slot_count, "Purchased commitment");

    match reserve_and_assign(service, clock, request).await {
        Ok((reservation, assignment)) => Ok(Provisioned {
            commitment,
            reservation,
            assignment,
        }),
        Err(mut err) => {
            tracing::warn!(
                commitment = %commitment.name,
                error = %err.cause,
                "Rolling back commitment purchase"
            );
            let outcome = retry_with_backoff(commitment_policy, || {
                service.delete_commitment(&commitment.name)
            })
            .await;
            note_rollback(&mut err, ResourceKind::Commitment, &commitment.name, outcome);
            Err(err)
        }
    }
}

/// Steps 2 and 3, with the inner reservation compensation.
async fn reserve_and_assign<S: ReservationService>(
    service: &S,
    clock: &dyn Clock,
    request: &PurchaseRequest,
) -> Result<(Reservation, Assignment), ProvisionError> {
    let scope = &request.scope;
    let id = reservation_id(clock.now(), &mut rand::thread_rng());
    tracing::info!(scope = %scope, reservation = %id, slots = request.slots, "Creating reservation");

    let reservation = service
        .create_reservation(scope, &id, request.slots)
        .await
        .map_err(|cause| ProvisionError::new(ProvisionStep::Reservation, cause))?;

    tracing::info!(reservation = %reservation.name, assignee = %scope.assignee(), "Creating assignment");
    match service
        .create_assignment(&reservation.name, &request.job_type, &scope.assignee())
        .await
    {
        Ok(assignment) => Ok((reservation, assignment)),
        Err(cause) => {
            tracing::warn!(
                reservation = %reservation.name,
                error = %cause,
                "Rolling back reservation creation"
            );
            let mut err = ProvisionError::new(ProvisionStep::Assignment, cause);
            let outcome = service.delete_reservation(&reservation.name).await;
            note_rollback(&mut err, ResourceKind::Reservation, &reservation.name, outcome);
            Err(err)
        }
    }
}

fn note_rollback(
    err: &mut ProvisionError,
    resource: ResourceKind,
    name: &str,
    outcome: Result<(), ServiceError>,
) {
    crate::metrics::record_rollback(resource, outcome.is_ok());
    match outcome {
        Ok(()) => tracing::info!(%resource, name = %name, "Rolled back"),
        Err(error) => {
            tracing::error!(
                %resource,
                name = %name,
                error = %error,
                cause = %err.cause,
                "Rollback failed; resource left behind"
            );
            err.rollback_failures.push(RollbackFailure {
                resource,
                name: name.to_string(),
                error,
            });
        }
    }
}
