//! Registered checks plus the process-wide identity and shutdown flag

use super::check::Check;
use crate::error::{HealthError, Result};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Top-level keys of the probe response document. Check identifiers share
/// the same namespace, so these can't be registered.
pub const RESERVED_KEYS: [&str; 3] = ["status", "_displayName", "_message"];

pub type CheckList = Arc<Vec<Arc<dyn Check>>>;

pub struct Registry {
    identifier: String,
    display_name: String,
    checks: RwLock<CheckList>,
    shutting_down: AtomicBool,
}

impl Registry {
    pub fn new(display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        Self {
            identifier: display_name.clone(),
            display_name,
            checks: RwLock::new(Arc::new(Vec::new())),
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn register<C: Check + 'static>(&self, check: C) -> Result<()> {
        self.register_arc(Arc::new(check))
    }

    /// Append a check. Registration order is the order checks run and appear
    /// in responses.
    ///
    /// Probes in flight keep the snapshot they started with.
    pub fn register_arc(&self, check: Arc<dyn Check>) -> Result<()> {
        let identifier = check.meta().identifier.clone();

        if identifier.is_empty() {
            return Err(HealthError::EmptyIdentifier);
        }
        if RESERVED_KEYS.contains(&identifier.as_str()) {
            return Err(HealthError::ReservedIdentifier(identifier));
        }

        let mut checks = self.checks.write();
        if checks.iter().any(|c| c.meta().identifier == identifier) {
            return Err(HealthError::DuplicateIdentifier(identifier));
        }

        let mut next = Vec::with_capacity(checks.len() + 1);
        next.extend(checks.iter().cloned());
        next.push(check);
        *checks = Arc::new(next);

        info!(check = %identifier, total = checks.len(), "Registered health check");
        Ok(())
    }

    pub fn checks(&self) -> CheckList {
        self.checks.read().clone()
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.checks()
            .iter()
            .map(|c| c.meta().identifier.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.checks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start draining: every later readiness probe answers DOWN.
    ///
    /// Returns `true` only for the call that flipped the flag.
    pub fn shutdown(&self) -> bool {
        let first = !self.shutting_down.swap(true, Ordering::AcqRel);
        if first {
            warn!(service = %self.display_name, "Shutdown requested, readiness now reports DOWN");
        }
        first
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("identifier", &self.identifier)
            .field("display_name", &self.display_name)
            .field("checks", &self.identifiers())
            .field("shutting_down", &self.is_shutting_down())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::check::{CheckMeta, CheckOutcome};
    use crate::health::checks::FnCheck;

    fn stub(meta: CheckMeta) -> FnCheck {
        FnCheck::new(meta, |_, _| CheckOutcome::up())
    }

    #[test]
    fn test_registration_keeps_order() {
        let registry = Registry::new("orders-api");
        registry.register(stub(CheckMeta::fatal("db"))).unwrap();
        registry.register(stub(CheckMeta::non_fatal("cache"))).unwrap();
        registry.register(stub(CheckMeta::fatal("queue"))).unwrap();

        assert_eq!(registry.identifiers(), vec!["db", "cache", "queue"]);
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.identifier(), "orders-api");
    }

    #[test]
    fn test_duplicate_identifier_rejected() {
        let registry = Registry::new("orders-api");
        registry.register(stub(CheckMeta::fatal("db"))).unwrap();

        let err = registry.register(stub(CheckMeta::non_fatal("db"))).unwrap_err();
        assert!(matches!(err, HealthError::DuplicateIdentifier(ref id) if id == "db"));
        assert_eq!(registry.len(), 1);
        assert!(registry.checks()[0].meta().fatal);
    }

    #[test]
    fn test_reserved_and_empty_identifiers_rejected() {
        let registry = Registry::new("orders-api");
        for key in RESERVED_KEYS {
            let err = registry.register(stub(CheckMeta::fatal(key))).unwrap_err();
            assert!(matches!(err, HealthError::ReservedIdentifier(_)));
        }
        assert!(matches!(
            registry.register(stub(CheckMeta::fatal(""))).unwrap_err(),
            HealthError::EmptyIdentifier
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_unaffected_by_later_registration() {
        let registry = Registry::new("orders-api");
        registry.register(stub(CheckMeta::fatal("db"))).unwrap();
        let snapshot = registry.checks();
        registry.register(stub(CheckMeta::fatal("queue"))).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.checks().len(), 2);
    }

    #[test]
    fn test_shutdown_transitions_once() {
        let registry = Registry::new("orders-api").with_identifier("orders");
        assert!(!registry.is_shutting_down());
        assert!(registry.shutdown());
        assert!(registry.is_shutting_down());
        assert!(!registry.shutdown());
        assert!(registry.is_shutting_down());
        assert_eq!(registry.identifier(), "orders");
    }

    #[test]
    fn test_shutdown_visible_across_threads() {
        let registry = Arc::new(Registry::new("orders-api"));
        let writer = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || registry.shutdown())
        };
        assert!(writer.join().unwrap());
        assert!(registry.is_shutting_down());
    }
}
