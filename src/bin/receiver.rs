//! Reading relay service.
//!
//! Serves either `POST /temperature` (one queue message per reading) or
//! `POST /dataSequence` (one message per request), chosen by
//! `RECEIVER_VARIANT`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState};
use reading_pipeline::config::load_receiver_config;
use redpanda::{Producer, RedpandaConfig};
use telemetry::{health, init_tracing_from_env};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env("receiver");

    // rustls 0.23+ requires explicit crypto provider selection
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("A rustls crypto provider was already installed");
    }

    info!("Starting reading relay v{}", env!("CARGO_PKG_VERSION"));

    let config = load_receiver_config().context("Invalid receiver configuration")?;

    info!(
        variant = config.variant.as_str(),
        path = config.variant.path(),
        brokers = %config.redpanda.broker_string(),
        topic = %config.redpanda.topic,
        sasl_username = config.redpanda.sasl_username.as_deref().unwrap_or("none"),
        "Loaded receiver config"
    );

    let producer = Arc::new(Producer::new(config.redpanda.clone()));

    check_health(&config.redpanda).await;

    let state = AppState::new(producer, config.variant);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!(metrics = ?telemetry::metrics().snapshot().relay, "Shutdown complete");
    Ok(())
}

/// Check the queue on startup. An unreachable broker does not stop the
/// relay; readiness stays down until publishes succeed.
async fn check_health(config: &RedpandaConfig) {
    if redpanda::health::check_connection(config).await {
        health().redpanda.set_healthy();
        info!("Redpanda connection: healthy");
    } else {
        health().redpanda.set_unhealthy("Connection failed");
        error!("Redpanda connection: unhealthy");
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
