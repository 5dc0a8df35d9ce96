//! Bearer tokens for the Reservation API.
//!
//! Either a fixed token (local runs, tests) or the GCE/Cloud Run metadata
//! server, which hands out short-lived tokens for the attached service
//! account. Metadata tokens are cached until shortly before they expire.

use bq_reservations_core::ServiceError;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Default metadata server token endpoint.
pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Tokens are refreshed this long before the server-reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

/// A token and the instant it should be refreshed.
///
/// `refresh_at` is `None` when the reported lifetime cannot be represented;
/// such a token is used once and fetched again on the next call.
#[derive(Debug, Clone)]
pub struct CachedToken {
    value: String,
    refresh_at: Option<Instant>,
}

/// Where access tokens come from.
#[derive(Debug, Clone)]
pub enum TokenSource {
    /// A fixed token, sent as-is.
    Static(String),
    /// The instance metadata server.
    MetadataServer {
        /// Token endpoint.
        url: String,
        /// Last token fetched, shared across clones.
        cache: Arc<Mutex<Option<CachedToken>>>,
    },
}

impl TokenSource {
    /// A fixed token.
    #[must_use]
    pub fn fixed(token: impl Into<String>) -> Self {
        Self::Static(token.into())
    }

    /// The metadata server at `url`.
    #[must_use]
    pub fn metadata_server(url: impl Into<String>) -> Self {
        Self::MetadataServer {
            url: url.into(),
            cache: Arc::new(Mutex::new(None)),
        }
    }

    /// Current access token, fetching a fresh one if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Unauthenticated`] if the metadata server
    /// cannot be reached or returns no token.
    pub async fn token(&self, http: &Client) -> Result<String, ServiceError> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::MetadataServer { url, cache } => {
                let mut cached = cache.lock().await;
                if let Some(token) = cached
                    .as_ref()
                    .filter(|t| t.refresh_at.is_some_and(|at| Instant::now() < at))
                {
                    return Ok(token.value.clone());
                }
                let fresh = fetch(http, url).await?;
                let value = fresh.value.clone();
                *cached = Some(fresh);
                Ok(value)
            }
        }
    }
}

async fn fetch(http: &Client, url: &str) -> Result<CachedToken, ServiceError> {
    tracing::debug!(url = %url, "Fetching access token from metadata server");
    let response = http
        .get(url)
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .map_err(|e| ServiceError::Unauthenticated(format!("metadata server unreachable: {e}")))?;

    if !response.status().is_success() {
        return Err(ServiceError::Unauthenticated(format!(
            "metadata server returned {}",
            response.status()
        )));
    }

    let body: TokenResponse = response
        .json()
        .await
        .map_err(|e| ServiceError::Unauthenticated(format!("bad metadata token response: {e}")))?;

    Ok(CachedToken {
        value: body.access_token,
        refresh_at: refresh_deadline(Instant::now(), body.expires_in),
    })
}

fn refresh_deadline(now: Instant, expires_in: u64) -> Option<Instant> {
    now.checked_add(Duration::from_secs(expires_in).saturating_sub(EXPIRY_MARGIN))
}
