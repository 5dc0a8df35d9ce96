//! BigQuery reservation lifecycle HTTP server.
//!
//! Serves report, cleanup and purchase over `POST /` against the Reservation
//! API, authenticating with a fixed token or the instance metadata server.

mod config;

use anyhow::Context;
use bq_reservations_client::{RestReservationClient, TokenSource};
use bq_reservations_runtime::metrics::install_prometheus;
use bq_reservations_web::{router, AppState};
use config::Config;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bq_reservations=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting BigQuery reservation server");

    let config = Config::from_env().context("invalid configuration")?;
    info!(
        api_url = %config.api_url,
        default_location = %config.default_location,
        default_slots = config.default_slots,
        static_token = config.access_token.is_some(),
        metrics = config.metrics_enabled,
        "Configuration loaded"
    );

    let tokens = match &config.access_token {
        Some(token) => TokenSource::fixed(token.clone()),
        None => TokenSource::metadata_server(config.metadata_token_url.clone()),
    };
    let client = RestReservationClient::with_base_url(config.api_url.clone(), tokens);

    let mut state = AppState::new(client)
        .with_defaults(config.defaults())
        .with_commitment_retry(config.commitment_retry());
    if config.metrics_enabled {
        state = state.with_metrics(install_prometheus()?);
    }
    let app = router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Waits for:
/// - Ctrl+C (SIGINT)
/// - SIGTERM (Cloud Run and most orchestrators)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
