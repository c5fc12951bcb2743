//! Error types for registry setup and configuration

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HealthError>;

/// Startup-time failures. Probe handling itself never fails: a broken
/// dependency is reported as a check status, not as an error.
#[derive(Error, Debug)]
pub enum HealthError {
    #[error("Check identifier cannot be empty")]
    EmptyIdentifier,

    #[error("Check identifier '{0}' is reserved for the response document")]
    ReservedIdentifier(String),

    #[error("Check identifier '{0}' is already registered")]
    DuplicateIdentifier(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
