//! Signaling Relay
//!
//! Authenticated WebSocket rooms for WebRTC signaling.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize Prometheus metrics recorder
//! 3. Build the relay (registry + token verifier)
//! 4. Bind the HTTP/WebSocket listener and mark ready
//! 5. Serve until SIGINT/SIGTERM, then drain sessions

#![warn(clippy::pedantic)]

use signaling_relay::config::Config;
use signaling_relay::errors::RelayError;
use signaling_relay::observability::{metrics, HealthState};
use signaling_relay::relay::SignalingRelay;
use signaling_relay::routes::{self, AppState};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "signaling_relay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Signaling Relay");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        RelayError::from(e)
    })?;

    info!(
        bind_address = %config.bind_address,
        app_name = %config.app_name,
        token_ttl_seconds = config.token_ttl.as_secs(),
        clock_skew_seconds = config.clock_skew.as_secs(),
        peer_queue_capacity = config.peer_queue_capacity,
        max_message_bytes = config.max_message_bytes,
        "Configuration loaded successfully"
    );

    // Must happen before any metrics are recorded
    let metrics_handle = metrics::init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        RelayError::Metrics(e)
    })?;

    let relay = Arc::new(SignalingRelay::from_config(&config));
    let health = Arc::new(HealthState::new());

    let state = Arc::new(AppState {
        relay: Arc::clone(&relay),
        config: config.clone(),
        health: Arc::clone(&health),
    });
    let app = routes::build_routes(state, metrics_handle);

    // Bind listener before marking ready to fail fast on bind errors
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %config.bind_address, "Failed to bind listener");
            RelayError::Bind {
                addr: config.bind_address.clone(),
                source: e,
            }
        })?;
    info!(addr = %config.bind_address, "Signaling relay listening");

    health.set_ready();

    let shutdown_health = Arc::clone(&health);
    let shutdown_relay = Arc::clone(&relay);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutdown signal received, initiating graceful shutdown...");

            // Stop advertising readiness first so no new sessions arrive
            shutdown_health.set_not_ready();

            // Every session runs its leave sequence and closes its socket
            shutdown_relay.shutdown();
        })
        .await
        .map_err(|e| {
            error!(error = %e, "Server failed");
            RelayError::Serve(e)
        })?;

    info!("Signaling relay shutdown complete");
    Ok(())
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM.
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
            Ok(mut sig) => {
                sig.recv().await;
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
        () = ctrl_c => {},
        () = terminate => {},
    }
}
