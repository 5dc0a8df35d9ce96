//! Remote reservation service contract.

use crate::error::ServiceError;
use crate::types::{Assignment, Commitment, JobType, Page, Plan, Reservation, Scope};
use std::future::Future;

/// Result type for service calls.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// CRUD calls against the reservation API for one caller.
///
/// This trait abstracts over the transport: the REST client in
/// `bq-reservations-client` implements it for production and the in-memory
/// service in `bq-reservations-testing` implements it for tests.
///
/// Listing calls return a single [`Page`]; use
/// [`pagination`](crate::pagination) to walk every page lazily.
///
/// Retries are not the implementor's concern. The runtime wraps calls that
/// need them.
pub trait ReservationService: Send + Sync {
    /// List one page of capacity commitments in `scope`.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the remote call fails.
    fn list_commitments(
        &self,
        scope: &Scope,
        page_token: Option<&str>,
    ) -> impl Future<Output = ServiceResult<Page<Commitment>>> + Send;

    /// List one page of reservations in `scope`.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the remote call fails.
    fn list_reservations(
        &self,
        scope: &Scope,
        page_token: Option<&str>,
    ) -> impl Future<Output = ServiceResult<Page<Reservation>>> + Send;

    /// List one page of assignments under `reservation_name`.
    ///
    /// # Errors
    ///
    /// Returns a [`ServiceError`] if the remote call fails.
    fn list_assignments(
        &self,
        reservation_name: &str,
        page_token: Option<&str>,
    ) -> impl Future<Output = ServiceResult<Page<Assignment>>> + Send;

    /// Purchase a capacity commitment.
    ///
    /// # Errors
    ///
    /// Fails on invalid scope or exhausted quota.
    fn create_commitment(
        &self,
        scope: &Scope,
        plan: &Plan,
        slot_count: u64,
    ) -> impl Future<Output = ServiceResult<Commitment>> + Send;

    /// Create a reservation with the client-chosen `reservation_id`.
    ///
    /// # Errors
    ///
    /// Fails if the id is taken or the scope is invalid.
    fn create_reservation(
        &self,
        scope: &Scope,
        reservation_id: &str,
        slot_capacity: u64,
    ) -> impl Future<Output = ServiceResult<Reservation>> + Send;

    /// Bind `assignee` to `reservation_name` for `job_type`.
    ///
    /// # Errors
    ///
    /// Fails if the reservation does not exist or the assignee is invalid.
    fn create_assignment(
        &self,
        reservation_name: &str,
        job_type: &JobType,
        assignee: &str,
    ) -> impl Future<Output = ServiceResult<Assignment>> + Send;

    /// Delete an assignment by full name.
    ///
    /// # Errors
    ///
    /// Fails if the assignment does not exist.
    fn delete_assignment(&self, name: &str) -> impl Future<Output = ServiceResult<()>> + Send;

    /// Delete a reservation by full name.
    ///
    /// # Errors
    ///
    /// Fails if the reservation does not exist or still has assignments.
    fn delete_reservation(&self, name: &str) -> impl Future<Output = ServiceResult<()>> + Send;

    /// Delete a capacity commitment by full name.
    ///
    /// # Errors
    ///
    /// Fails if the commitment does not exist or is still referenced.
    fn delete_commitment(&self, name: &str) -> impl Future<Output = ServiceResult<()>> + Send;
}
