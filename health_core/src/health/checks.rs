//! Reusable check implementations for embedding applications

use super::check::{Check, CheckMeta, CheckOutcome};
use super::params::QueryParams;
use super::status::{ProbeType, Status};
use parking_lot::Mutex;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use sysinfo::System;
use tokio::fs;

type CheckFn = dyn Fn(&QueryParams, ProbeType) -> CheckOutcome + Send + Sync;

/// Check backed by a synchronous closure.
///
/// The closure runs on the blocking pool, so it may block on I/O and still
/// be cut off by the aggregator's per-check deadline.
pub struct FnCheck {
    meta: CheckMeta,
    probes: Vec<ProbeType>,
    check_fn: Arc<CheckFn>,
}

impl FnCheck {
    pub fn new<F>(meta: CheckMeta, check_fn: F) -> Self
    where
        F: Fn(&QueryParams, ProbeType) -> CheckOutcome + Send + Sync + 'static,
    {
        Self {
            meta,
            probes: ProbeType::ALL.to_vec(),
            check_fn: Arc::new(check_fn),
        }
    }

    /// Restrict the check to the given probe types.
    pub fn for_probes(mut self, probes: &[ProbeType]) -> Self {
        self.probes = probes.to_vec();
        self
    }

    pub fn only(self, probe: ProbeType) -> Self {
        self.for_probes(&[probe])
    }
}

#[async_trait::async_trait]
impl Check for FnCheck {
    fn meta(&self) -> &CheckMeta {
        &self.meta
    }

    fn supports(&self, probe: ProbeType) -> bool {
        self.probes.contains(&probe)
    }

    async fn execute(&self, params: &QueryParams, probe: ProbeType) -> CheckOutcome {
        let check_fn = Arc::clone(&self.check_fn);
        let params = params.clone();

        match tokio::task::spawn_blocking(move || (*check_fn)(&params, probe)).await {
            Ok(outcome) => outcome,
            // Re-raised so the aggregator reports it like any other panicking check.
            Err(e) if e.is_panic() => panic::resume_unwind(e.into_panic()),
            Err(e) => CheckOutcome::down(format!("Check task failed: {}", e)),
        }
    }
}

/// Verifies that paths exist and are writable.
///
/// UP when every path passes, PARTIAL when some fail, DOWN when all fail.
pub struct FilesystemCheck {
    meta: CheckMeta,
    paths: Vec<PathBuf>,
    probes: Vec<ProbeType>,
}

impl FilesystemCheck {
    pub fn new(meta: CheckMeta, paths: Vec<PathBuf>) -> Self {
        Self {
            meta,
            paths,
            probes: vec![ProbeType::Readiness],
        }
    }

    pub fn for_probes(mut self, probes: &[ProbeType]) -> Self {
        self.probes = probes.to_vec();
        self
    }

    async fn inspect(path: &Path) -> Option<String> {
        if fs::metadata(path).await.is_err() {
            return Some(format!("Path does not exist: {}", path.display()));
        }

        let dir = if path.is_dir() {
            path
        } else {
            match path.parent() {
                Some(parent) => parent,
                None => return Some(format!("Cannot write to path: {}", path.display())),
            }
        };

        let probe_file = dir.join(".health_check_temp");
        match fs::write(&probe_file, "ok").await {
            Ok(_) => {
                let _ = fs::remove_file(&probe_file).await;
                None
            }
            Err(_) => Some(format!("Cannot write to path: {}", path.display())),
        }
    }
}

#[async_trait::async_trait]
impl Check for FilesystemCheck {
    fn meta(&self) -> &CheckMeta {
        &self.meta
    }

    fn supports(&self, probe: ProbeType) -> bool {
        self.probes.contains(&probe)
    }

    async fn execute(&self, _params: &QueryParams, _probe: ProbeType) -> CheckOutcome {
        let mut issues = Vec::new();
        for path in &self.paths {
            if let Some(issue) = Self::inspect(path).await {
                issues.push(issue);
            }
        }

        if issues.is_empty() {
            CheckOutcome::up()
        } else if issues.len() < self.paths.len() {
            CheckOutcome::with_message(Status::Partial, issues.join(", "))
        } else {
            CheckOutcome::down(issues.join(", "))
        }
    }
}

/// Reports SLOW or DOWN when system memory usage crosses a threshold.
pub struct MemoryCheck {
    meta: CheckMeta,
    slow_percent: f64,
    down_percent: f64,
    system: Mutex<System>,
}

impl MemoryCheck {
    pub fn new(meta: CheckMeta, slow_percent: f64, down_percent: f64) -> Self {
        Self {
            meta,
            slow_percent,
            down_percent,
            system: Mutex::new(System::new()),
        }
    }

    fn usage_percent(&self) -> Option<f64> {
        let mut system = self.system.lock();
        system.refresh_memory();
        let total = system.total_memory();
        if total == 0 {
            return None;
        }
        Some(system.used_memory() as f64 / total as f64 * 100.0)
    }
}

pub fn classify_usage(usage_percent: f64, slow_percent: f64, down_percent: f64) -> Status {
    if usage_percent >= down_percent {
        Status::Down
    } else if usage_percent >= slow_percent {
        Status::Slow
    } else {
        Status::Up
    }
}

#[async_trait::async_trait]
impl Check for MemoryCheck {
    fn meta(&self) -> &CheckMeta {
        &self.meta
    }

    async fn execute(&self, _params: &QueryParams, _probe: ProbeType) -> CheckOutcome {
        match self.usage_percent() {
            Some(usage) => {
                let status = classify_usage(usage, self.slow_percent, self.down_percent);
                if status == Status::Up {
                    CheckOutcome::up()
                } else {
                    CheckOutcome::with_message(status, format!("Memory usage at {:.1}%", usage))
                }
            }
            None => CheckOutcome::with_message(Status::Unknown, "Memory totals unavailable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fn_check_probe_filter() {
        let check = FnCheck::new(CheckMeta::fatal("db"), |_, _| CheckOutcome::up()).only(ProbeType::Readiness);
        assert!(check.supports(ProbeType::Readiness));
        assert!(!check.supports(ProbeType::Liveness));

        let all = FnCheck::new(CheckMeta::fatal("db"), |_, _| CheckOutcome::up());
        assert!(all.supports(ProbeType::Liveness));
        assert!(all.supports(ProbeType::Readiness));
    }

    #[tokio::test]
    async fn test_fn_check_receives_params() {
        let check = FnCheck::new(CheckMeta::fatal("echo"), |params, probe| {
            CheckOutcome::with_message(Status::Up, format!("{}:{}", probe, params.get("shard").unwrap_or("-")))
        });
        let params: QueryParams = [("shard", "7")].into_iter().collect();
        let outcome = check.execute(&params, ProbeType::Liveness).await;
        assert_eq!(outcome.message.as_deref(), Some("liveness:7"));
    }

    #[tokio::test]
    async fn test_filesystem_check_all_writable() {
        let dir = TempDir::new().unwrap();
        let check = FilesystemCheck::new(CheckMeta::fatal("disk"), vec![dir.path().to_path_buf()]);

        let outcome = check.execute(&QueryParams::new(), ProbeType::Readiness).await;
        assert_eq!(outcome.status, Status::Up);
        assert!(outcome.message.is_none());
        assert!(!dir.path().join(".health_check_temp").exists());
    }

    #[tokio::test]
    async fn test_filesystem_check_partial_and_down() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");

        let check = FilesystemCheck::new(
            CheckMeta::fatal("disk"),
            vec![dir.path().to_path_buf(), missing.clone()],
        );
        let outcome = check.execute(&QueryParams::new(), ProbeType::Readiness).await;
        assert_eq!(outcome.status, Status::Partial);
        assert!(outcome.message.unwrap().contains("does not exist"));

        let check = FilesystemCheck::new(CheckMeta::fatal("disk"), vec![missing]);
        let outcome = check.execute(&QueryParams::new(), ProbeType::Readiness).await;
        assert_eq!(outcome.status, Status::Down);
    }

    #[tokio::test]
    async fn test_fn_check_panic_propagates_payload() {
        use futures_util::FutureExt;

        let check = FnCheck::new(CheckMeta::fatal("broken"), |_, _| panic!("pool poisoned"));
        let params = QueryParams::new();
        let result = std::panic::AssertUnwindSafe(check.execute(&params, ProbeType::Liveness))
            .catch_unwind()
            .await;

        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"pool poisoned"));
    }

    #[test]
    fn test_filesystem_check_defaults_to_readiness() {
        let check = FilesystemCheck::new(CheckMeta::fatal("disk"), Vec::new());
        assert!(check.supports(ProbeType::Readiness));
        assert!(!check.supports(ProbeType::Liveness));
    }

    #[test]
    fn test_classify_usage() {
        assert_eq!(classify_usage(40.0, 85.0, 95.0), Status::Up);
        assert_eq!(classify_usage(85.0, 85.0, 95.0), Status::Slow);
        assert_eq!(classify_usage(97.5, 85.0, 95.0), Status::Down);
    }

    #[tokio::test]
    async fn test_memory_check_reports_a_status() {
        let check = MemoryCheck::new(CheckMeta::non_fatal("memory"), 101.0, 102.0);
        let outcome = check.execute(&QueryParams::new(), ProbeType::Liveness).await;
        assert!(matches!(outcome.status, Status::Up | Status::Unknown));
    }
}
