//! Reservation id generation.
//!
//! Ids look like `reservation-20261016-1432-qwhzkprm`: a minute-resolution
//! UTC timestamp plus an 8-letter random suffix so two transactions started
//! in the same minute still get distinct ids.

use chrono::{DateTime, Utc};
use rand::Rng;

/// Prefix of every generated reservation id.
pub const RESERVATION_PREFIX: &str = "reservation";

/// Length of the random suffix.
pub const SUFFIX_LEN: usize = 8;

/// Random lowercase ASCII letters.
pub fn random_suffix<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
        .collect()
}

/// Build a reservation id for a transaction started at `now`.
///
/// Must be called once per transaction; never cache the result.
pub fn reservation_id<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> String {
    format!(
        "{RESERVATION_PREFIX}-{}-{}",
        now.format("%Y%m%d-%H%M"),
        random_suffix(rng, SUFFIX_LEN)
    )
}
