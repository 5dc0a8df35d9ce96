//! Configuration management for the reservation server.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Unlike a silent fallback, a variable that is set but unparseable is an
//! error: a typo in `DEFAULT_SLOTS` should not quietly purchase 100 slots.

use bq_reservations_client::auth::METADATA_TOKEN_URL;
use bq_reservations_client::DEFAULT_BASE_URL;
use bq_reservations_core::{DEFAULT_LOCATION, DEFAULT_SLOTS};
use bq_reservations_runtime::RetryPolicy;
use bq_reservations_web::Defaults;
use serde::Serialize;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Invalid configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set to something that does not parse.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Parse failure.
        reason: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Host to bind to (`HOST`)
    pub host: String,
    /// Port to bind to (`PORT`)
    pub port: u16,
    /// Location used when a request has none (`DEFAULT_LOCATION`)
    pub default_location: String,
    /// Slots purchased when a request has none (`DEFAULT_SLOTS`)
    pub default_slots: u64,
    /// Reservation API base URL (`RESERVATION_API_URL`)
    pub api_url: String,
    /// Fixed bearer token (`RESERVATION_ACCESS_TOKEN`); the metadata server
    /// is used when absent
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    /// Metadata server token endpoint (`METADATA_TOKEN_URL`)
    pub metadata_token_url: String,
    /// Budget for deleting one commitment, retries included
    /// (`COMMITMENT_DELETE_DEADLINE_SECS`)
    pub commitment_delete_deadline_secs: u64,
    /// Serve `GET /metrics` (`METRICS_ENABLED`)
    pub metrics_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a set variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a set variable has an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let text = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let default_slots = parsed(&lookup, "DEFAULT_SLOTS", DEFAULT_SLOTS)?;
        if default_slots == 0 {
            return Err(ConfigError::Invalid {
                key: "DEFAULT_SLOTS",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        Ok(Self {
            host: text("HOST", "0.0.0.0"),
            port: parsed(&lookup, "PORT", 8080)?,
            default_location: text("DEFAULT_LOCATION", DEFAULT_LOCATION),
            default_slots,
            api_url: text("RESERVATION_API_URL", DEFAULT_BASE_URL),
            access_token: lookup("RESERVATION_ACCESS_TOKEN").filter(|t| !t.trim().is_empty()),
            metadata_token_url: text("METADATA_TOKEN_URL", METADATA_TOKEN_URL),
            commitment_delete_deadline_secs: parsed(
                &lookup,
                "COMMITMENT_DELETE_DEADLINE_SECS",
                90,
            )?,
            metrics_enabled: flag(&lookup, "METRICS_ENABLED", false)?,
        })
    }

    /// `host:port`
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Request defaults for the web layer.
    #[must_use]
    pub fn defaults(&self) -> Defaults {
        Defaults {
            location: self.default_location.clone(),
            slots: self.default_slots,
        }
    }

    /// Commitment-delete retry policy with the configured deadline.
    #[must_use]
    pub fn commitment_retry(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(1)
            .initial_delay(Duration::from_secs(1))
            .max_delay(Duration::from_secs(60))
            .deadline(Duration::from_secs(self.commitment_delete_deadline_secs))
            .build()
    }
}

fn parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value,
            reason: e.to_string(),
        }),
    }
}

fn flag(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "" => Ok(default),
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value,
            reason: "expected a boolean".to_string(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.default_location, "EU");
        assert_eq!(config.default_slots, 100);
        assert_eq!(config.api_url, DEFAULT_BASE_URL);
        assert_eq!(config.access_token, None);
        assert_eq!(config.metadata_token_url, METADATA_TOKEN_URL);
        assert_eq!(config.commitment_delete_deadline_secs, 90);
        assert!(!config.metrics_enabled);
        assert_eq!(
            config.commitment_retry(),
            RetryPolicy::commitment_teardown()
        );
    }

    #[test]
    fn overrides_apply() {
        let config = load(&[
            ("PORT", "9000"),
            ("DEFAULT_LOCATION", "US"),
            ("DEFAULT_SLOTS", "500"),
            ("RESERVATION_ACCESS_TOKEN", "tok"),
            ("METRICS_ENABLED", "true"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(
            config.defaults(),
            Defaults {
                location: "US".to_string(),
                slots: 500
            }
        );
        assert_eq!(config.access_token.as_deref(), Some("tok"));
        assert!(config.metrics_enabled);
    }

    #[test]
    fn invalid_values_are_errors() {
        let err = load(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));

        let err = load(&[("DEFAULT_SLOTS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "DEFAULT_SLOTS", .. }));

        let err = load(&[("METRICS_ENABLED", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "METRICS_ENABLED", .. }));
    }

    #[test]
    fn access_token_not_serialized() {
        let config = load(&[("RESERVATION_ACCESS_TOKEN", "secret")]).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
