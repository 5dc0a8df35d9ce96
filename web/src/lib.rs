//! Axum HTTP surface for the BigQuery reservation lifecycle.
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives; the correlation-id layer tags it
//! 2. **Validate** the JSON body into a [`LifecycleRequest`]
//! 3. **Build** a per-request [`Lifecycle`](bq_reservations_runtime::Lifecycle)
//!    from [`AppState`]
//! 4. **Run** report, cleanup or purchase
//! 5. **Map result** to `{message, ..., severity}` JSON
//!
//! # Example
//!
//! ```ignore
//! use bq_reservations_web::{router, AppState};
//!
//! let app = router(AppState::new(client));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

// Re-export key types for convenience
pub use error::{AppError, Severity};
pub use extractors::CorrelationId;
pub use handlers::operations::{LifecycleRequest, OperationResponse};
pub use middleware::{correlation_id_layer, CORRELATION_ID_HEADER};
pub use router::router;
pub use state::{AppState, Defaults};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
