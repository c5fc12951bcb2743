//! The contract every registered health check implements

use super::params::QueryParams;
use super::status::{ProbeType, Status};
use serde::Serialize;

/// Immutable descriptor of a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckMeta {
    /// Whether this check may move the aggregate status past UP.
    pub fatal: bool,
    /// Key of the check's entry in the response document. Unique per registry.
    pub identifier: String,
    #[serde(rename = "_displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CheckMeta {
    pub fn new(identifier: impl Into<String>, fatal: bool) -> Self {
        Self {
            fatal,
            identifier: identifier.into(),
            display_name: None,
            description: None,
        }
    }

    pub fn fatal(identifier: impl Into<String>) -> Self {
        Self::new(identifier, true)
    }

    pub fn non_fatal(identifier: impl Into<String>) -> Self {
        Self::new(identifier, false)
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// What a single check reports for one probe request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub status: Status,
    pub message: Option<String>,
}

impl CheckOutcome {
    pub fn new(status: Status, message: Option<String>) -> Self {
        Self {
            status,
            message: message.filter(|m| !m.is_empty()),
        }
    }

    pub fn up() -> Self {
        Self::new(Status::Up, None)
    }

    pub fn status(status: Status) -> Self {
        Self::new(status, None)
    }

    pub fn with_message(status: Status, message: impl Into<String>) -> Self {
        Self::new(status, Some(message.into()))
    }

    pub fn down(message: impl Into<String>) -> Self {
        Self::with_message(Status::Down, message)
    }
}

impl From<Status> for CheckOutcome {
    fn from(status: Status) -> Self {
        Self::status(status)
    }
}

/// A health check supplied by the embedding application.
///
/// A failing dependency is reported through the returned status, usually
/// [`Status::Down`]; `execute` has no error channel. Implementations must not
/// block the async runtime for long: use async I/O or `spawn_blocking`.
#[async_trait::async_trait]
pub trait Check: Send + Sync {
    fn meta(&self) -> &CheckMeta;

    /// Whether this check runs for `probe`. Defaults to every probe type.
    fn supports(&self, _probe: ProbeType) -> bool {
        true
    }

    async fn execute(&self, params: &QueryParams, probe: ProbeType) -> CheckOutcome;
}
