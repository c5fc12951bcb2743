//! Main entry point for the probe server binary

use anyhow::Result;
use health_core::{
    create_app, run_server, AppConfig, CheckMeta, CheckOutcome, FilesystemCheck, FnCheck,
    LoggingConfig, MemoryCheck, ProbeType, Registry,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_tracing(&config.logging)?;

    info!("Configuration loaded successfully");
    info!("Server will bind to: {}", config.bind_address());

    let addr: SocketAddr = config.bind_address().parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address: {}", e))?;

    let registry = Arc::new(build_registry(&config)?);

    info!(
        "Service: {} ({}) with {} registered checks",
        registry.display_name(),
        registry.identifier(),
        registry.len()
    );

    let app = create_app(Arc::clone(&registry), &config);

    run_server(app, addr, registry, config.server.shutdown_drain()).await?;

    info!("Server shutdown complete");
    Ok(())
}

fn build_registry(config: &AppConfig) -> Result<Registry> {
    let registry = Registry::new(config.service.display_name.clone())
        .with_identifier(config.service.identifier.clone());

    registry.register(
        FnCheck::new(
            CheckMeta::fatal("process")
                .with_display_name("Process")
                .with_description("Answers as long as the runtime can serve requests"),
            |_, _| CheckOutcome::up(),
        )
        .only(ProbeType::Liveness),
    )?;

    let checks = &config.checks;

    if !checks.filesystem_paths.is_empty() {
        registry.register(FilesystemCheck::new(
            CheckMeta::new("filesystem", checks.filesystem_fatal)
                .with_display_name("Filesystem")
                .with_description("Configured paths exist and are writable"),
            checks.filesystem_paths.clone(),
        ))?;
    }

    if checks.memory_enabled {
        registry.register(MemoryCheck::new(
            CheckMeta::new("memory", checks.memory_fatal)
                .with_display_name("Memory")
                .with_description("System memory usage below configured thresholds"),
            checks.memory_slow_percent,
            checks.memory_down_percent,
        ))?;
    }

    Ok(registry)
}

/// `RUST_LOG` wins over `logging.filter` when set.
fn log_filter(logging: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&logging.filter)
            .map_err(|e| anyhow::anyhow!("Invalid logging filter '{}': {}", logging.filter, e)),
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let (json, plain) = if logging.json {
        (Some(fmt::layer().json().with_current_span(true).flatten_event(true)), None)
    } else {
        (None, Some(fmt::layer().compact().with_target(true)))
    };

    tracing_subscriber::registry()
        .with(log_filter(logging)?)
        .with(json)
        .with(plain)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        let logging = LoggingConfig::default();
        assert!(EnvFilter::try_new(&logging.filter).is_ok());
    }

    #[test]
    fn test_registry_from_defaults() {
        let mut config = AppConfig::default();
        config.checks.filesystem_paths.clear();
        config.checks.memory_enabled = false;

        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.identifier(), "health-server");
    }
}
