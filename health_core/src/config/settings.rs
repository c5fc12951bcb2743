use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub service: ServiceConfig,
    pub probes: ProbeConfig,
    pub checks: ChecksConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds between flipping readiness to DOWN and closing the listener.
    pub shutdown_drain_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub identifier: String,
    pub display_name: String,
    /// Mounted in front of every probe path, e.g. `/internal`.
    pub route_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Per-check deadline; 0 disables it.
    pub check_timeout_ms: u64,
    pub concurrent: bool,
    pub expose_meta: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecksConfig {
    pub filesystem_paths: Vec<PathBuf>,
    pub filesystem_fatal: bool,
    pub memory_enabled: bool,
    pub memory_fatal: bool,
    pub memory_slow_percent: f64,
    pub memory_down_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8086,
            shutdown_drain_seconds: 5,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            identifier: "health-server".to_string(),
            display_name: "Health Server".to_string(),
            route_prefix: String::new(),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            check_timeout_ms: 5000,
            concurrent: false,
            expose_meta: true,
        }
    }
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            filesystem_paths: vec![PathBuf::from("./")],
            filesystem_fatal: true,
            memory_enabled: true,
            memory_fatal: false,
            memory_slow_percent: 85.0,
            memory_down_percent: 95.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "health_server=info,health_core=info,tower_http=info".to_string(),
            json: false,
        }
    }
}

impl ProbeConfig {
    pub fn check_timeout(&self) -> Option<Duration> {
        (self.check_timeout_ms > 0).then(|| Duration::from_millis(self.check_timeout_ms))
    }
}

impl ServerConfig {
    pub fn shutdown_drain(&self) -> Duration {
        Duration::from_secs(self.shutdown_drain_seconds)
    }
}

impl AppConfig {
    /// Defaults, then `config.toml` if present, then `APP_` environment
    /// variables (`APP_SERVER__PORT`, `APP_PROBES__CHECK_TIMEOUT_MS`, ...).
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?);

        if std::path::Path::new("config.toml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        builder = builder.add_source(
            Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port cannot be 0".to_string()));
        }

        if self.service.display_name.trim().is_empty() {
            return Err(ConfigError::Message(
                "Service display name cannot be empty".to_string(),
            ));
        }

        if self.service.identifier.trim().is_empty() {
            return Err(ConfigError::Message(
                "Service identifier cannot be empty".to_string(),
            ));
        }

        let prefix = &self.service.route_prefix;
        if !prefix.is_empty() && !prefix.starts_with('/') {
            return Err(ConfigError::Message(
                "Route prefix must start with '/'".to_string(),
            ));
        }

        let checks = &self.checks;
        if !(0.0..=100.0).contains(&checks.memory_slow_percent)
            || !(0.0..=100.0).contains(&checks.memory_down_percent)
        {
            return Err(ConfigError::Message(
                "Memory thresholds must be between 0 and 100".to_string(),
            ));
        }

        if checks.memory_slow_percent > checks.memory_down_percent {
            return Err(ConfigError::Message(
                "Memory slow threshold cannot exceed the down threshold".to_string(),
            ));
        }

        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::Message(
                "Logging filter cannot be empty".to_string(),
            ));
        }

        if self.probes.check_timeout_ms == 0 {
            tracing::warn!("Per-check timeout disabled - a hung check will block its probe");
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8086);
        assert_eq!(config.service.display_name, "Health Server");
        assert_eq!(config.probes.check_timeout(), Some(Duration::from_millis(5000)));
        assert!(!config.probes.concurrent);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        config.server.port = 0;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.service.display_name = "  ".to_string();
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.service.route_prefix = "internal".to_string();
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.checks.memory_slow_percent = 99.0;
        config.checks.memory_down_percent = 90.0;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.checks.memory_down_percent = 120.0;
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.logging.filter = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let probes = ProbeConfig {
            check_timeout_ms: 0,
            ..ProbeConfig::default()
        };
        assert_eq!(probes.check_timeout(), None);
    }

    #[test]
    fn test_bind_address() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:8086");

        let mut config = AppConfig::default();
        config.server.host = "0.0.0.0".to_string();
        config.server.port = 9000;
        assert_eq!(config.bind_address(), "0.0.0.0:9000");
    }

    #[test]
    fn test_config_loading() {
        let config = AppConfig::load().expect("Should load default configuration");

        assert!(config.validate().is_ok());
        assert!(!config.service.identifier.is_empty());
        assert!(config.server.port > 0);
    }
}
