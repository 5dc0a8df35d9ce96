//! Route table.

use crate::handlers::{dispatch, health_check, metrics};
use crate::middleware::correlation_id_layer;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use bq_reservations_core::ReservationService;
use tower_http::trace::TraceLayer;

/// Build the service router.
///
/// | Route | Handler |
/// |---|---|
/// | `POST /` | [`dispatch`] |
/// | `GET /health` | [`health_check`] |
/// | `GET /metrics` | [`metrics`] |
///
/// The correlation-id layer is outermost, so every response carries
/// `X-Correlation-ID`, including rejections and 404s.
pub fn router<S>(state: AppState<S>) -> Router
where
    S: ReservationService + Clone + 'static,
{
    Router::new()
        .route("/", post(dispatch::<S>))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics::<S>))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
}
