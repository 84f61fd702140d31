//! jwtauth service
//!
//! Publishes the merged key set of every configured JWKS endpoint and
//! verifies bearer tokens against it.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize tracing (text or JSON)
//! 3. Initialize Prometheus metrics recorder
//! 4. Start the key registry pollers
//! 5. Wait (bounded) for any key source to succeed
//! 6. Serve HTTP until SIGINT/SIGTERM
//! 7. Stop the pollers

#![warn(clippy::pedantic)]

use anyhow::Context;
use jwtauth::KeyRegistry;
use jwtauth_service::config::{Config, LogFormat};
use jwtauth_service::observability::metrics::init_metrics_recorder;
use jwtauth_service::routes::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "jwtauth=info,jwtauth_service=info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    init_tracing(config.log_format);

    info!("Starting jwtauth service");
    info!(
        jwks_urls = ?config.jwks_urls,
        bind_address = %config.bind_address,
        fetch_timeout_seconds = config.fetch_timeout.as_secs(),
        min_refresh_seconds = config.min_refresh_interval.as_secs(),
        allow_anonymous = config.allow_anonymous,
        "Configuration loaded successfully"
    );

    // Must happen before the registry records anything
    let metrics_handle = init_metrics_recorder().map_err(anyhow::Error::msg)?;
    info!("Prometheus metrics recorder initialized");

    let registry = KeyRegistry::new(config.registry_config())?;
    let registry_handle = registry.start()?;
    info!(sources = registry.source_count(), "Key registry started");

    if tokio::time::timeout(config.startup_wait, registry.wait_for_any_success())
        .await
        .is_err()
    {
        warn!(
            wait_seconds = config.startup_wait.as_secs(),
            "No key source succeeded before startup deadline; serving with an empty key set"
        );
    }

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.bind_address, "Invalid bind address");
        anyhow::anyhow!("Invalid bind address {}: {e}", config.bind_address)
    })?;

    let state = Arc::new(AppState {
        registry: registry.clone(),
        config,
    });
    let app = routes::build_routes(state, metrics_handle);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "jwtauth service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    registry_handle.shutdown().await;
    info!("jwtauth service shutdown complete");

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => subscriber.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => subscriber.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
