//! Health check aggregation with liveness and readiness probe endpoints.

pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;

pub use config::{AppConfig, LoggingConfig};
pub use error::{HealthError, Result};
pub use handlers::{probe_routes, ProbeState};
pub use health::{
    Aggregator, Check, CheckMeta, CheckOutcome, CheckReport, FilesystemCheck, FnCheck,
    HealthReport, MemoryCheck, MetaDocument, ProbeType, QueryParams, Registry, Status,
};
pub use middleware::logging_layer;

use axum::Router;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::info;

/// Build the application router with probe routes bound to `registry`.
pub fn create_app(registry: Arc<Registry>, config: &AppConfig) -> Router {
    let state = ProbeState::new(registry, Aggregator::from_config(&config.probes));

    Router::new()
        .merge(probe_routes(&config.service.route_prefix, config.probes.expose_meta))
        .layer(logging_layer())
        .with_state(state)
}

/// Serve until Ctrl+C or SIGTERM.
///
/// On the signal the registry is marked as shutting down first, so readiness
/// fails while `drain` elapses; only then does the listener stop accepting.
pub async fn run_server(app: Router, addr: SocketAddr, registry: Arc<Registry>, drain: Duration) -> Result<()> {
    info!("Starting probe server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            begin_drain(&registry, drain).await;
        })
        .await?;

    Ok(())
}

/// Flip readiness to DOWN and give load balancers `drain` to notice.
pub async fn begin_drain(registry: &Registry, drain: Duration) {
    if registry.shutdown() && !drain.is_zero() {
        info!("Draining for {:?} before closing the listener", drain);
        tokio::time::sleep(drain).await;
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
