//! Runs the applicable checks for a probe and folds them into one report

use super::check::{Check, CheckOutcome};
use super::params::QueryParams;
use super::registry::Registry;
use super::status::{ProbeType, Status};
use crate::config::ProbeConfig;
use axum::http::StatusCode;
use futures_util::future::join_all;
use futures_util::FutureExt;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub const SHUTDOWN_MESSAGE: &str = "Shutting down";

/// One check's entry in a [`HealthReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    #[serde(skip)]
    pub identifier: String,
    pub status: Status,
    #[serde(rename = "_message", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "_displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Result of one probe request.
///
/// Serializes as a single flat object: `status`, `_displayName`, optional
/// `_message`, then one key per check in registration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub probe: ProbeType,
    pub status: Status,
    pub display_name: String,
    pub message: Option<String>,
    pub checks: Vec<CheckReport>,
}

impl HealthReport {
    /// The fixed readiness answer once the process is draining.
    pub fn shutting_down(display_name: impl Into<String>) -> Self {
        Self {
            probe: ProbeType::Readiness,
            status: Status::Down,
            display_name: display_name.into(),
            message: Some(SHUTDOWN_MESSAGE.to_string()),
            checks: Vec::new(),
        }
    }

    pub fn http_status(&self) -> StatusCode {
        self.status.http_status()
    }

    pub fn check(&self, identifier: &str) -> Option<&CheckReport> {
        self.checks.iter().find(|c| c.identifier == identifier)
    }
}

impl Serialize for HealthReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("status", &self.status)?;
        map.serialize_entry("_displayName", &self.display_name)?;
        if let Some(message) = &self.message {
            map.serialize_entry("_message", message)?;
        }
        for check in &self.checks {
            map.serialize_entry(&check.identifier, check)?;
        }
        map.end()
    }
}

/// Executes checks for one probe request.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    check_timeout: Option<Duration>,
    concurrent: bool,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self {
            check_timeout: config.check_timeout(),
            concurrent: config.concurrent,
        }
    }

    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = Some(timeout);
        self
    }

    pub fn concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Run every check that supports `probe` and escalate their statuses.
    ///
    /// Only fatal checks move the aggregate; non-fatal ones are reported but
    /// leave it at UP. The shutdown flag is not consulted here.
    pub async fn run(&self, registry: &Registry, probe: ProbeType, params: &QueryParams) -> HealthReport {
        let started = Instant::now();
        let snapshot = registry.checks();

        // A check whose `supports` panics is still reported, as DOWN.
        let mut applicable: Vec<(&Arc<dyn Check>, Option<CheckOutcome>)> = Vec::with_capacity(snapshot.len());
        for check in snapshot.iter() {
            match panic::catch_unwind(AssertUnwindSafe(|| check.supports(probe))) {
                Ok(true) => applicable.push((check, None)),
                Ok(false) => {}
                Err(payload) => {
                    let reason = panic_message(&*payload);
                    error!(check = %check.meta().identifier, probe = %probe, reason = %reason, "Health check panicked in supports");
                    applicable.push((check, Some(CheckOutcome::down(format!("Check panicked: {}", reason)))));
                }
            }
        }

        let outcomes: Vec<CheckOutcome> = if self.concurrent {
            join_all(applicable.iter().map(|(check, failed)| async move {
                match failed {
                    Some(outcome) => outcome.clone(),
                    None => self.execute_guarded(check, params, probe).await,
                }
            }))
            .await
        } else {
            let mut outcomes = Vec::with_capacity(applicable.len());
            for (check, failed) in &applicable {
                let outcome = match failed {
                    Some(outcome) => outcome.clone(),
                    None => self.execute_guarded(check, params, probe).await,
                };
                outcomes.push(outcome);
            }
            outcomes
        };

        let mut worst = Status::Up;
        let mut checks = Vec::with_capacity(outcomes.len());

        for ((check, _), outcome) in applicable.iter().zip(outcomes) {
            let meta = check.meta();
            if meta.fatal {
                worst = worst.worst(outcome.status);
            }
            checks.push(CheckReport {
                identifier: meta.identifier.clone(),
                status: outcome.status,
                message: outcome.message,
                display_name: meta.display_name.clone(),
            });
        }

        let report = HealthReport {
            probe,
            status: worst,
            display_name: registry.display_name().to_string(),
            message: None,
            checks,
        };

        info!(
            probe = %probe,
            status = %report.status,
            checks = report.checks.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Probe evaluated"
        );

        report
    }

    /// Run one check, turning a panic or an overrun into that check's own DOWN.
    async fn execute_guarded(&self, check: &Arc<dyn Check>, params: &QueryParams, probe: ProbeType) -> CheckOutcome {
        let identifier = check.meta().identifier.as_str();
        let started = Instant::now();
        let invocation = AssertUnwindSafe(check.execute(params, probe)).catch_unwind();

        let result = match self.check_timeout {
            Some(limit) => match tokio::time::timeout(limit, invocation).await {
                Ok(result) => result,
                Err(_) => {
                    error!(check = identifier, probe = %probe, timeout_ms = limit.as_millis() as u64, "Health check timed out");
                    return CheckOutcome::down(format!("Check timed out after {}ms", limit.as_millis()));
                }
            },
            None => invocation.await,
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(panic) => {
                let reason = panic_message(&*panic);
                error!(check = identifier, probe = %probe, reason = %reason, "Health check panicked");
                return CheckOutcome::down(format!("Check panicked: {}", reason));
            }
        };

        let elapsed = started.elapsed();
        match outcome.status {
            Status::Up => debug!(check = identifier, probe = %probe, ?elapsed, "Health check passed"),
            Status::Down => error!(
                check = identifier,
                probe = %probe,
                ?elapsed,
                message = outcome.message.as_deref().unwrap_or(""),
                "Health check failed"
            ),
            status => warn!(
                check = identifier,
                probe = %probe,
                status = %status,
                ?elapsed,
                message = outcome.message.as_deref().unwrap_or(""),
                "Health check degraded"
            ),
        }

        outcome
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
