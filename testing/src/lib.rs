//! # BigQuery Reservations Testing
//!
//! Test doubles for the reservation lifecycle:
//! - [`InMemoryReservationService`]: a stateful stand-in for the remote API
//!   with call recording and failure injection
//! - [`FixedClock`]: deterministic time for reservation naming
//!
//! ## Example
//!
//! ```
//! use bq_reservations_core::{Plan, ReservationService, Scope};
//! use bq_reservations_testing::{InMemoryReservationService, Operation};
//!
//! # tokio_test::block_on(async {
//! let service = InMemoryReservationService::new();
//! let scope = Scope::new("my-project", "EU");
//! service.create_commitment(&scope, &Plan::Flex, 100).await.unwrap();
//!
//! assert_eq!(service.commitment_count(), 1);
//! assert_eq!(service.calls()[0].operation(), Operation::CreateCommitment);
//! # });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod service;

use chrono::{DateTime, Utc};
use bq_reservations_core::environment::Clock;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making generated reservation ids
    /// predictable up to their random suffix.
    ///
    /// # Example
    ///
    /// ```
    /// use bq_reservations_testing::mocks::FixedClock;
    /// use bq_reservations_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// 2025-01-01 00:00:00 UTC
    const TEST_EPOCH_SECS: i64 = 1_735_689_600;

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::from_timestamp(TEST_EPOCH_SECS, 0).unwrap_or_default())
    }
}

pub use mocks::{FixedClock, test_clock};
pub use service::{Call, InMemoryReservationService, Operation};
