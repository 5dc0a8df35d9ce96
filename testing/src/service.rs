//! In-memory reservation service.
//!
//! Models the parts of the remote API the lifecycle depends on: scoped
//! listings with pagination, server-assigned names, and the precondition
//! that a reservation with assignments cannot be deleted. Every call is
//! recorded, and failures can be injected per operation.

use bq_reservations_core::service::ServiceResult;
use bq_reservations_core::{
    Assignment, Commitment, JobType, Page, Plan, Reservation, ReservationService, Scope,
    ServiceError,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Service operations, for failure injection and call assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `list_commitments`
    ListCommitments,
    /// `list_reservations`
    ListReservations,
    /// `list_assignments`
    ListAssignments,
    /// `create_commitment`
    CreateCommitment,
    /// `create_reservation`
    CreateReservation,
    /// `create_assignment`
    CreateAssignment,
    /// `delete_assignment`
    DeleteAssignment,
    /// `delete_reservation`
    DeleteReservation,
    /// `delete_commitment`
    DeleteCommitment,
}

/// A recorded call with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `list_commitments`
    ListCommitments {
        /// Scope parent path.
        parent: String,
        /// Requested page token.
        page_token: Option<String>,
    },
    /// `list_reservations`
    ListReservations {
        /// Scope parent path.
        parent: String,
        /// Requested page token.
        page_token: Option<String>,
    },
    /// `list_assignments`
    ListAssignments {
        /// Reservation name.
        reservation: String,
        /// Requested page token.
        page_token: Option<String>,
    },
    /// `create_commitment`
    CreateCommitment {
        /// Scope parent path.
        parent: String,
        /// Plan.
        plan: Plan,
        /// Slot count.
        slot_count: u64,
    },
    /// `create_reservation`
    CreateReservation {
        /// Scope parent path.
        parent: String,
        /// Client-chosen id.
        reservation_id: String,
        /// Slot capacity.
        slot_capacity: u64,
    },
    /// `create_assignment`
    CreateAssignment {
        /// Reservation name.
        reservation: String,
        /// Job type.
        job_type: JobType,
        /// Assignee path.
        assignee: String,
    },
    /// `delete_assignment`
    DeleteAssignment {
        /// Assignment name.
        name: String,
    },
    /// `delete_reservation`
    DeleteReservation {
        /// Reservation name.
        name: String,
    },
    /// `delete_commitment`
    DeleteCommitment {
        /// Commitment name.
        name: String,
    },
}

impl Call {
    /// The operation this call invoked.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::ListCommitments { .. } => Operation::ListCommitments,
            Self::ListReservations { .. } => Operation::ListReservations,
            Self::ListAssignments { .. } => Operation::ListAssignments,
            Self::CreateCommitment { .. } => Operation::CreateCommitment,
            Self::CreateReservation { .. } => Operation::CreateReservation,
            Self::CreateAssignment { .. } => Operation::CreateAssignment,
            Self::DeleteAssignment { .. } => Operation::DeleteAssignment,
            Self::DeleteReservation { .. } => Operation::DeleteReservation,
            Self::DeleteCommitment { .. } => Operation::DeleteCommitment,
        }
    }

    /// Whether the call only reads.
    #[must_use]
    pub const fn is_read(&self) -> bool {
        matches!(
            self,
            Self::ListCommitments { .. } | Self::ListReservations { .. } | Self::ListAssignments { .. }
        )
    }
}

#[derive(Debug, Clone)]
struct Injected {
    remaining: Option<usize>,
    error: ServiceError,
}

/// Capacity of a deleted reservation that still pins commitments for a few
/// more commitment deletes.
#[derive(Debug, Clone)]
struct Releasing {
    parent: String,
    slot_capacity: u64,
    checks_left: usize,
}

#[derive(Debug, Default)]
struct State {
    commitments: Vec<(String, Commitment)>,
    reservations: Vec<(String, Reservation)>,
    assignments: Vec<Assignment>,
    releasing: Vec<Releasing>,
    next_id: u64,
    failures: HashMap<Operation, Injected>,
    calls: Vec<Call>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Slots reserved in `parent`, counting reservations still being released.
    /// Each call uses up one check of every releasing entry in `parent`.
    fn referenced_slots(&mut self, parent: &str) -> u64 {
        let live: u64 = self
            .reservations
            .iter()
            .filter(|(owner, _)| owner == parent)
            .map(|(_, r)| r.slot_capacity)
            .sum();
        let mut releasing = 0;
        for entry in self.releasing.iter_mut().filter(|e| e.parent == parent) {
            releasing += entry.slot_capacity;
            entry.checks_left -= 1;
        }
        self.releasing.retain(|e| e.checks_left > 0);
        live + releasing
    }

    /// Record the call, then return an injected failure if one is armed.
    fn enter(&mut self, call: Call) -> ServiceResult<()> {
        let operation = call.operation();
        self.calls.push(call);

        let Some(injected) = self.failures.get_mut(&operation) else {
            return Ok(());
        };
        let error = injected.error.clone();
        match injected.remaining.as_mut() {
            None => Err(error),
            Some(0) => Ok(()),
            Some(remaining) => {
                *remaining -= 1;
                Err(error)
            }
        }
    }
}

/// In-memory [`ReservationService`].
///
/// Cloning shares state, so a clone handed to the code under test can be
/// inspected afterwards.
///
/// A commitment cannot be deleted while the reservations of its scope need
/// its slots: the delete fails with
/// [`ServiceError::FailedPrecondition`] when the remaining commitments would
/// hold fewer slots than are reserved.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReservationService {
    state: Arc<Mutex<State>>,
    page_size: Option<usize>,
    release_lag: usize,
}

impl InMemoryReservationService {
    /// Empty service returning every listing in one page.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Split listings into pages of `page_size` items.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    /// Keep a deleted reservation's slots referenced for the next `checks`
    /// commitment deletes in its scope.
    #[must_use]
    pub const fn with_release_lag(mut self, checks: usize) -> Self {
        self.release_lag = checks;
        self
    }

    /// Fail every call to `operation` with `error`.
    pub fn fail_always(&self, operation: Operation, error: ServiceError) {
        self.lock().failures.insert(
            operation,
            Injected {
                remaining: None,
                error,
            },
        );
    }

    /// Fail the next `times` calls to `operation` with `error`.
    pub fn fail_times(&self, operation: Operation, times: usize, error: ServiceError) {
        self.lock().failures.insert(
            operation,
            Injected {
                remaining: Some(times),
                error,
            },
        );
    }

    /// Remove injected failures.
    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Calls made so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Commitments across all scopes.
    #[must_use]
    pub fn commitment_count(&self) -> usize {
        self.lock().commitments.len()
    }

    /// Reservations across all scopes.
    #[must_use]
    pub fn reservation_count(&self) -> usize {
        self.lock().reservations.len()
    }

    /// Assignments across all reservations.
    #[must_use]
    pub fn assignment_count(&self) -> usize {
        self.lock().assignments.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn page<T: Clone>(&self, items: &[T], page_token: Option<&str>) -> ServiceResult<Page<T>> {
        let start = match page_token {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| ServiceError::InvalidArgument(format!("bad page token {token}")))?,
        };
        let Some(size) = self.page_size else {
            return Ok(Page::last(items.get(start..).unwrap_or_default().to_vec()));
        };
        let end = (start + size).min(items.len());
        let slice = items.get(start..end).unwrap_or_default().to_vec();
        let next = (end < items.len()).then(|| end.to_string());
        Ok(Page::new(slice, next))
    }
}

impl ReservationService for InMemoryReservationService {
    fn list_commitments(
        &self,
        scope: &Scope,
        page_token: Option<&str>,
    ) -> impl Future<Output = ServiceResult<Page<Commitment>>> + Send {
        let parent = scope.parent();
        let result = {
            let mut state = self.lock();
            state
                .enter(Call::ListCommitments {
                    parent: parent.clone(),
                    page_token: page_token.map(str::to_string),
                })
                .map(|()| {
                    state
                        .commitments
                        .iter()
                        .filter(|(owner, _)| *owner == parent)
                        .map(|(_, commitment)| commitment.clone())
                        .collect::<Vec<_>>()
                })
        };
        let result = result.and_then(|items| self.page(&items, page_token));
        async move { result }
    }

    fn list_reservations(
        &self,
        scope: &Scope,
        page_token: Option<&str>,
    ) -> impl Future<Output = ServiceResult<Page<Reservation>>> + Send {
        let parent = scope.parent();
        let result = {
            let mut state = self.lock();
            state
                .enter(Call::ListReservations {
                    parent: parent.clone(),
                    page_token: page_token.map(str::to_string),
                })
                .map(|()| {
                    state
                        .reservations
                        .iter()
                        .filter(|(owner, _)| *owner == parent)
                        .map(|(_, reservation)| reservation.clone())
                        .collect::<Vec<_>>()
                })
        };
        let result = result.and_then(|items| self.page(&items, page_token));
        async move { result }
    }

    fn list_assignments(
        &self,
        reservation_name: &str,
        page_token: Option<&str>,
    ) -> impl Future<Output = ServiceResult<Page<Assignment>>> + Send {
        let result = {
            let mut state = self.lock();
            state
                .enter(Call::ListAssignments {
                    reservation: reservation_name.to_string(),
                    page_token: page_token.map(str::to_string),
                })
                .map(|()| {
                    state
                        .assignments
                        .iter()
                        .filter(|a| a.reservation_name() == Some(reservation_name))
                        .cloned()
                        .collect::<Vec<_>>()
                })
        };
        let result = result.and_then(|items| self.page(&items, page_token));
        async move { result }
    }

    fn create_commitment(
        &self,
        scope: &Scope,
        plan: &Plan,
        slot_count: u64,
    ) -> impl Future<Output = ServiceResult<Commitment>> + Send {
        let parent = scope.parent();
        let result = {
            let mut state = self.lock();
            state
                .enter(Call::CreateCommitment {
                    parent: parent.clone(),
                    plan: plan.clone(),
                    slot_count,
                })
                .and_then(|()| {
                    if slot_count == 0 {
                        return Err(ServiceError::InvalidArgument(
                            "slot_count must be positive".to_string(),
                        ));
                    }
                    let id = state.next_id();
                    let commitment = Commitment {
                        name: format!("{parent}/capacityCommitments/{id}"),
                        plan: plan.clone(),
                        slot_count,
                    };
                    state.commitments.push((parent, commitment.clone()));
                    Ok(commitment)
                })
        };
        async move { result }
    }

    fn create_reservation(
        &self,
        scope: &Scope,
        reservation_id: &str,
        slot_capacity: u64,
    ) -> impl Future<Output = ServiceResult<Reservation>> + Send {
        let parent = scope.parent();
        let result = {
            let mut state = self.lock();
            state
                .enter(Call::CreateReservation {
                    parent: parent.clone(),
                    reservation_id: reservation_id.to_string(),
                    slot_capacity,
                })
                .and_then(|()| {
                    let name = format!("{parent}/reservations/{reservation_id}");
                    if state.reservations.iter().any(|(_, r)| r.name == name) {
                        return Err(ServiceError::Api {
                            status: 409,
                            message: format!("Reservation {name} already exists"),
                        });
                    }
                    let reservation = Reservation {
                        name,
                        slot_capacity,
                        ignore_idle_slots: false,
                    };
                    state.reservations.push((parent, reservation.clone()));
                    Ok(reservation)
                })
        };
        async move { result }
    }

    fn create_assignment(
        &self,
        reservation_name: &str,
        job_type: &JobType,
        assignee: &str,
    ) -> impl Future<Output = ServiceResult<Assignment>> + Send {
        let result = {
            let mut state = self.lock();
            state
                .enter(Call::CreateAssignment {
                    reservation: reservation_name.to_string(),
                    job_type: job_type.clone(),
                    assignee: assignee.to_string(),
                })
                .and_then(|()| {
                    if !state.reservations.iter().any(|(_, r)| r.name == reservation_name) {
                        return Err(ServiceError::NotFound(reservation_name.to_string()));
                    }
                    let id = state.next_id();
                    let assignment = Assignment {
                        name: format!("{reservation_name}/assignments/{id}"),
                        job_type: job_type.clone(),
                        assignee: assignee.to_string(),
                    };
                    state.assignments.push(assignment.clone());
                    Ok(assignment)
                })
        };
        async move { result }
    }

    fn delete_assignment(&self, name: &str) -> impl Future<Output = ServiceResult<()>> + Send {
        let result = {
            let mut state = self.lock();
            state
                .enter(Call::DeleteAssignment {
                    name: name.to_string(),
                })
                .and_then(|()| {
                    let before = state.assignments.len();
                    state.assignments.retain(|a| a.name != name);
                    if state.assignments.len() == before {
                        Err(ServiceError::NotFound(name.to_string()))
                    } else {
                        Ok(())
                    }
                })
        };
        async move { result }
    }

    fn delete_reservation(&self, name: &str) -> impl Future<Output = ServiceResult<()>> + Send {
        let result = {
            let mut state = self.lock();
            state
                .enter(Call::DeleteReservation {
                    name: name.to_string(),
                })
                .and_then(|()| {
                    if state
                        .assignments
                        .iter()
                        .any(|a| a.reservation_name() == Some(name))
                    {
                        return Err(ServiceError::FailedPrecondition(format!(
                            "Reservation {name} still has assignments"
                        )));
                    }
                    let Some(index) = state.reservations.iter().position(|(_, r)| r.name == name)
                    else {
                        return Err(ServiceError::NotFound(name.to_string()));
                    };
                    let (parent, reservation) = state.reservations.remove(index);
                    if self.release_lag > 0 {
                        state.releasing.push(Releasing {
                            parent,
                            slot_capacity: reservation.slot_capacity,
                            checks_left: self.release_lag,
                        });
                    }
                    Ok(())
                })
        };
        async move { result }
    }

    fn delete_commitment(&self, name: &str) -> impl Future<Output = ServiceResult<()>> + Send {
        let result = {
            let mut state = self.lock();
            state
                .enter(Call::DeleteCommitment {
                    name: name.to_string(),
                })
                .and_then(|()| {
                    let Some(index) = state.commitments.iter().position(|(_, c)| c.name == name)
                    else {
                        return Err(ServiceError::NotFound(name.to_string()));
                    };
                    let parent = state.commitments[index].0.clone();
                    let committed: u64 = state
                        .commitments
                        .iter()
                        .filter(|(owner, c)| *owner == parent && c.name != name)
                        .map(|(_, c)| c.slot_count)
                        .sum();
                    if state.referenced_slots(&parent) > committed {
                        return Err(ServiceError::FailedPrecondition(format!(
                            "Capacity commitment {name} is still referenced by reservations"
                        )));
                    }
                    state.commitments.remove(index);
                    Ok(())
                })
        };
        async move { result }
    }
}
