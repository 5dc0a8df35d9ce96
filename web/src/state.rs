//! Application state for Axum handlers.
//!
//! Holds what outlives a single request: the reservation service (for the
//! REST client, its connection pool and token cache), request defaults, the
//! commitment-delete retry policy, the clock and the optional metrics handle.
//! Each request builds its own [`Lifecycle`] from it.

use bq_reservations_core::environment::{Clock, SystemClock};
use bq_reservations_core::{DEFAULT_LOCATION, DEFAULT_SLOTS, ReservationService};
use bq_reservations_runtime::{Lifecycle, RetryPolicy};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Values used when a request omits `location` or `slots`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    /// Location when the request has none.
    pub location: String,
    /// Slot count when the request has none.
    pub slots: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            location: DEFAULT_LOCATION.to_string(),
            slots: DEFAULT_SLOTS,
        }
    }
}

/// Application state shared across all HTTP handlers.
///
/// # Examples
///
/// ```ignore
/// let state = AppState::new(RestReservationClient::new(tokens))
///     .with_defaults(Defaults { location: "US".into(), slots: 500 });
/// let app = router(state);
/// ```
#[derive(Clone)]
pub struct AppState<S> {
    service: S,
    defaults: Defaults,
    commitment_retry: RetryPolicy,
    clock: Arc<dyn Clock>,
    metrics: Option<PrometheusHandle>,
}

impl<S: ReservationService + Clone> AppState<S> {
    /// Create a new application state with default settings.
    #[must_use]
    pub fn new(service: S) -> Self {
        Self {
            service,
            defaults: Defaults::default(),
            commitment_retry: RetryPolicy::commitment_teardown(),
            clock: Arc::new(SystemClock),
            metrics: None,
        }
    }

    /// Replace the request defaults.
    #[must_use]
    pub fn with_defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Replace the commitment-delete retry policy.
    #[must_use]
    pub fn with_commitment_retry(mut self, policy: RetryPolicy) -> Self {
        self.commitment_retry = policy;
        self
    }

    /// Replace the clock used for reservation naming.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Serve `GET /metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Request defaults.
    #[must_use]
    pub const fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// Prometheus handle, if metrics are enabled.
    #[must_use]
    pub const fn metrics(&self) -> Option<&PrometheusHandle> {
        self.metrics.as_ref()
    }

    /// A lifecycle runner for one request.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle<S> {
        Lifecycle::new(self.service.clone())
            .with_clock(Arc::clone(&self.clock))
            .with_commitment_retry(self.commitment_retry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bq_reservations_testing::InMemoryReservationService;

    #[test]
    fn test_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState<InMemoryReservationService>>();
    }

    #[test]
    fn test_default_request_values() {
        let state = AppState::new(InMemoryReservationService::new());
        assert_eq!(state.defaults().location, "EU");
        assert_eq!(state.defaults().slots, 100);
        assert!(state.metrics().is_none());
    }
}
