//! # BigQuery Reservations Runtime
//!
//! The three lifecycle operations over a [`ReservationService`]:
//!
//! - **report**: enumerate reservations, their assignments and commitments
//! - **cleanup**: delete all of them in dependency order
//! - **purchase**: buy a commitment and bind it to a new reservation and
//!   assignment, rolling back on partial failure
//!
//! All remote calls are sequential. Nothing is shared between invocations
//! except what the caller passes in.
//!
//! ## Example
//!
//! ```ignore
//! use bq_reservations_runtime::{Lifecycle, PurchaseRequest};
//! use bq_reservations_core::Scope;
//!
//! let lifecycle = Lifecycle::new(client);
//! let provisioned = lifecycle
//!     .purchase(&PurchaseRequest::new(Scope::new("my-project", "EU"), 100))
//!     .await?;
//! println!("{}", provisioned.reservation.name);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod inventory;
pub mod metrics;
pub mod provisioning;
pub mod retry;
pub mod teardown;

pub use inventory::{Inventory, ReservationEntry};
pub use provisioning::{
    ProvisionError, ProvisionStep, Provisioned, PurchaseRequest, RollbackFailure,
};
pub use retry::RetryPolicy;
pub use teardown::CleanupError;

use bq_reservations_core::environment::{Clock, SystemClock};
use bq_reservations_core::{ReservationService, Scope, ServiceError};
use std::sync::Arc;
use std::time::Instant;

/// Runs lifecycle operations against one service.
pub struct Lifecycle<S> {
    service: S,
    clock: Arc<dyn Clock>,
    commitment_retry: RetryPolicy,
}

impl<S: ReservationService> Lifecycle<S> {
    /// Use the system clock and [`RetryPolicy::commitment_teardown`].
    #[must_use]
    pub fn new(service: S) -> Self {
        Self {
            service,
            clock: Arc::new(SystemClock),
            commitment_retry: RetryPolicy::commitment_teardown(),
        }
    }

    /// Replace the clock used for reservation naming.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the retry policy for commitment deletes.
    #[must_use]
    pub fn with_commitment_retry(mut self, policy: RetryPolicy) -> Self {
        self.commitment_retry = policy;
        self
    }

    /// The underlying service.
    pub const fn service(&self) -> &S {
        &self.service
    }

    /// List every resource in `scope` as report lines.
    ///
    /// # Errors
    ///
    /// Returns the first listing failure.
    pub async fn report(&self, scope: &Scope) -> Result<Vec<String>, ServiceError> {
        let started = Instant::now();
        let result = inventory::enumerate(&self.service, scope)
            .await
            .map(|inventory| inventory.report_lines());
        metrics::record_operation("report", result.is_ok(), started.elapsed());
        result
    }

    /// Delete every resource in `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`CleanupError`] at the first failed call.
    pub async fn cleanup(&self, scope: &Scope) -> Result<Vec<String>, CleanupError> {
        let started = Instant::now();
        let result = teardown::cleanup(&self.service, scope, &self.commitment_retry).await;
        metrics::record_operation("cleanup", result.is_ok(), started.elapsed());
        result
    }

    /// Purchase and wire up new capacity.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError`] after compensating for partial creation.
    pub async fn purchase(&self, request: &PurchaseRequest) -> Result<Provisioned, ProvisionError> {
        let started = Instant::now();
        let result = provisioning::purchase(
            &self.service,
            self.clock.as_ref(),
            request,
            &self.commitment_retry,
        )
        .await;
        metrics::record_operation("purchase", result.is_ok(), started.elapsed());
        result
    }
}
