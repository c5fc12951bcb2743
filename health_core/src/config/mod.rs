pub mod settings;

pub use settings::{AppConfig, ChecksConfig, LoggingConfig, ProbeConfig, ServerConfig, ServiceConfig};
