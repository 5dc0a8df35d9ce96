//! Health check and metrics endpoints.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode};
use bq_reservations_core::ReservationService;

/// Simple health check endpoint (for basic liveness).
///
/// Returns 200 OK to indicate the service is running. The reservation API
/// is not contacted.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Prometheus scrape endpoint.
///
/// 404 when the server was started without metrics.
///
/// # Endpoint
///
/// ```text
/// GET /metrics
/// ```
#[allow(clippy::unused_async)]
pub async fn metrics<S>(State(state): State<AppState<S>>) -> (StatusCode, String)
where
    S: ReservationService + Clone + 'static,
{
    match state.metrics() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics disabled".to_string()),
    }
}
