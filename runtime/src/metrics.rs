//! Prometheus metrics for lifecycle operations.
//!
//! Counters are recorded unconditionally through the `metrics` facade; they
//! are no-ops until a recorder is installed with [`install_prometheus`].
//!
//! # Metrics
//!
//! - `reservation_operations_total{operation, outcome}`
//! - `reservation_operation_duration_seconds{operation}`
//! - `reservation_rollbacks_total{resource, outcome}`
//! - `reservation_remote_retries_total`

use bq_reservations_core::ResourceKind;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics setup.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Install the Prometheus recorder and return a handle for rendering the
/// scrape payload.
///
/// # Errors
///
/// Returns [`MetricsError`] if a recorder is already installed or the
/// exporter cannot be built.
pub fn install_prometheus() -> Result<PrometheusHandle, MetricsError> {
    register_metrics();

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?;

    let handle = builder
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    tracing::info!("Prometheus metrics recorder installed");
    Ok(handle)
}

fn register_metrics() {
    describe_counter!(
        "reservation_operations_total",
        "Lifecycle operations by name and outcome"
    );
    describe_histogram!(
        "reservation_operation_duration_seconds",
        "Wall time of lifecycle operations"
    );
    describe_counter!(
        "reservation_rollbacks_total",
        "Compensating deletes by resource kind and outcome"
    );
    describe_counter!(
        "reservation_remote_retries_total",
        "Remote calls retried after a failure"
    );
}

/// Record a finished lifecycle operation.
pub fn record_operation(operation: &'static str, succeeded: bool, duration: Duration) {
    let outcome = if succeeded { "success" } else { "failure" };
    counter!("reservation_operations_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
    histogram!("reservation_operation_duration_seconds", "operation" => operation)
        .record(duration.as_secs_f64());
}

/// Record a compensating delete.
pub fn record_rollback(resource: ResourceKind, succeeded: bool) {
    let outcome = if succeeded { "success" } else { "failure" };
    counter!("reservation_rollbacks_total", "resource" => resource.as_str(), "outcome" => outcome)
        .increment(1);
}

/// Record a retried remote call.
pub fn record_retry() {
    counter!("reservation_remote_retries_total").increment(1);
}
