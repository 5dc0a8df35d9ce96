//! Resource enumeration and the `report` operation.

use bq_reservations_core::pagination;
use bq_reservations_core::{Assignment, Commitment, Reservation, ReservationService, Scope, ServiceError};
use futures::TryStreamExt;

/// A reservation together with its assignments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationEntry {
    /// The reservation.
    pub reservation: Reservation,
    /// Its assignments, in server order.
    pub assignments: Vec<Assignment>,
}

/// Every reservation resource in a scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    /// Reservations with their assignments, in server order.
    pub reservations: Vec<ReservationEntry>,
    /// Commitments, in server order.
    pub commitments: Vec<Commitment>,
}

impl Inventory {
    /// Render as report lines: each reservation followed by its assignments,
    /// then every commitment.
    #[must_use]
    pub fn report_lines(&self) -> Vec<String> {
        let mut log = Vec::new();
        for entry in &self.reservations {
            log.push(format!("Reservation {}", entry.reservation.name));
            for assignment in &entry.assignments {
                log.push(format!("Assignment {}", assignment.name));
            }
        }
        for commitment in &self.commitments {
            log.push(format!("Commitment {}", commitment.name));
        }
        log
    }

    /// Total number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reservations
            .iter()
            .map(|entry| 1 + entry.assignments.len())
            .sum::<usize>()
            + self.commitments.len()
    }

    /// Whether the scope holds no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty() && self.commitments.is_empty()
    }
}

/// Every reservation in `scope`, all pages collected.
///
/// # Errors
///
/// Returns the first listing failure.
pub async fn list_reservations<S: ReservationService>(
    service: &S,
    scope: &Scope,
) -> Result<Vec<Reservation>, ServiceError> {
    pagination::reservations(service, scope).try_collect().await
}

/// Every assignment under `reservation_name`, all pages collected.
///
/// # Errors
///
/// Returns the first listing failure.
pub async fn list_assignments<S: ReservationService>(
    service: &S,
    reservation_name: &str,
) -> Result<Vec<Assignment>, ServiceError> {
    pagination::assignments(service, reservation_name)
        .try_collect()
        .await
}

/// Every commitment in `scope`, all pages collected.
///
/// # Errors
///
/// Returns the first listing failure.
pub async fn list_commitments<S: ReservationService>(
    service: &S,
    scope: &Scope,
) -> Result<Vec<Commitment>, ServiceError> {
    pagination::commitments(service, scope).try_collect().await
}

/// Walk reservations, their assignments, then commitments. Read-only.
///
/// # Errors
///
/// Returns the first listing failure.
pub async fn enumerate<S: ReservationService>(
    service: &S,
    scope: &Scope,
) -> Result<Inventory, ServiceError> {
    let mut reservations = Vec::new();
    for reservation in list_reservations(service, scope).await? {
        let assignments = list_assignments(service, &reservation.name).await?;
        reservations.push(ReservationEntry {
            reservation,
            assignments,
        });
    }

    let commitments = list_commitments(service, scope).await?;

    tracing::debug!(
        scope = %scope,
        reservations = reservations.len(),
        commitments = commitments.len(),
        "Enumerated reservation resources"
    );

    Ok(Inventory {
        reservations,
        commitments,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bq_reservations_core::{JobType, Plan};
    use bq_reservations_testing::{Call, InMemoryReservationService};

    #[tokio::test]
    async fn report_lists_reservations_assignments_then_commitments() {
        let service = InMemoryReservationService::new();
        let scope = Scope::new("p1", "EU");
        let commitment = service
            .create_commitment(&scope, &Plan::Flex, 100)
            .await
            .unwrap();
        let reservation = service
            .create_reservation(&scope, "res-a", 100)
            .await
            .unwrap();
        let assignment = service
            .create_assignment(&reservation.name, &JobType::Query, "projects/p1")
            .await
            .unwrap();

        let inventory = enumerate(&service, &scope).await.unwrap();

        assert_eq!(
            inventory.report_lines(),
            vec![
                format!("Reservation {}", reservation.name),
                format!("Assignment {}", assignment.name),
                format!("Commitment {}", commitment.name),
            ]
        );
        assert_eq!(inventory.len(), 3);
    }

    #[tokio::test]
    async fn enumeration_walks_every_page() {
        let service = InMemoryReservationService::new().with_page_size(2);
        let scope = Scope::new("p1", "EU");
        for i in 0..5 {
            service
                .create_reservation(&scope, &format!("res-{i}"), 10)
                .await
                .unwrap();
            service.create_commitment(&scope, &Plan::Flex, 10).await.unwrap();
        }
        service.clear_calls();

        let inventory = enumerate(&service, &scope).await.unwrap();

        assert_eq!(inventory.reservations.len(), 5);
        assert_eq!(inventory.commitments.len(), 5);
        let reservation_pages = service
            .calls()
            .iter()
            .filter(|call| matches!(call, Call::ListReservations { .. }))
            .count();
        assert_eq!(reservation_pages, 3);
    }

    #[tokio::test]
    async fn enumeration_has_no_side_effects() {
        let service = InMemoryReservationService::new();
        let scope = Scope::new("p1", "EU");
        service.create_reservation(&scope, "res-a", 10).await.unwrap();
        service.clear_calls();

        enumerate(&service, &scope).await.unwrap();

        assert!(service.calls().iter().all(Call::is_read));
        assert_eq!(service.reservation_count(), 1);
    }

    #[tokio::test]
    async fn empty_scope_reports_nothing() {
        let service = InMemoryReservationService::new();
        let inventory = enumerate(&service, &Scope::new("p1", "EU")).await.unwrap();
        assert!(inventory.is_empty());
        assert!(inventory.report_lines().is_empty());
    }
}
