//! # BigQuery Reservation API Client
//!
//! REST implementation of
//! [`ReservationService`](bq_reservations_core::ReservationService) against
//! `bigqueryreservation.googleapis.com/v1`.
//!
//! ## Example
//!
//! ```no_run
//! use bq_reservations_client::{RestReservationClient, TokenSource, auth::METADATA_TOKEN_URL};
//! use bq_reservations_core::{ReservationService, Scope};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RestReservationClient::new(TokenSource::metadata_server(METADATA_TOKEN_URL));
//!     let page = client
//!         .list_reservations(&Scope::new("my-project", "EU"), None)
//!         .await?;
//!     for reservation in page.items {
//!         println!("{}", reservation.name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Failures are mapped into
//! [`ServiceError`](bq_reservations_core::ServiceError) by [`error`]; retries
//! are left to the caller.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod client;
pub mod error;
pub mod types;

pub use auth::TokenSource;
pub use client::{DEFAULT_BASE_URL, RestReservationClient};
