//! # BigQuery Reservations Core
//!
//! Domain types and the remote service contract for driving BigQuery
//! capacity reservations through their lifecycle.
//!
//! ## Resources
//!
//! ```text
//! projects/{project}/locations/{location}            ← Scope
//!   ├── capacityCommitments/{id}                     ← Commitment (slots + plan)
//!   └── reservations/{reservation_id}                ← Reservation (slot capacity)
//!         └── assignments/{id}                       ← Assignment (job type + assignee)
//! ```
//!
//! An assignment never outlives its reservation, so teardown always walks
//! assignments → reservation → commitments.
//!
//! ## Crate layout
//!
//! - [`types`]: scope and resource types
//! - [`error`]: typed remote failures ([`ServiceError`])
//! - [`service`]: the [`ReservationService`] contract implemented by the REST
//!   client and by the in-memory test double
//! - [`pagination`]: lazy streams over paginated listings
//! - [`naming`]: unique reservation id generation
//! - [`environment`]: injectable clock

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod naming;
pub mod pagination;
pub mod service;
pub mod types;

pub use error::ServiceError;
pub use service::ReservationService;
pub use types::{
    Assignment, Commitment, JobType, Page, Plan, Reservation, ResourceKind, Scope,
    DEFAULT_LOCATION, DEFAULT_SLOTS,
};

/// Environment traits injected into the lifecycle runtime.
///
/// All time-dependent behaviour (reservation naming) reads the clock through
/// this trait so tests can pin it.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use bq_reservations_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock backed by [`Utc::now`].
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
