//! HTTP request handlers.

pub mod health;
pub mod operations;

pub use health::{health_check, metrics};
pub use operations::dispatch;
