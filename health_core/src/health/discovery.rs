//! Read-only description of what a registry would run

use super::registry::Registry;
use super::status::ProbeType;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckDescription {
    pub identifier: String,
    #[serde(rename = "_displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fatal: bool,
    pub probes: Vec<ProbeType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetaDocument {
    pub identifier: String,
    #[serde(rename = "_displayName")]
    pub display_name: String,
    pub checks: Vec<CheckDescription>,
}

impl MetaDocument {
    /// Describe the registry. Reads metadata and probe support only; no
    /// check is executed.
    pub fn from_registry(registry: &Registry) -> Self {
        let checks = registry
            .checks()
            .iter()
            .map(|check| {
                let meta = check.meta();
                CheckDescription {
                    identifier: meta.identifier.clone(),
                    display_name: meta.display_name.clone(),
                    description: meta.description.clone(),
                    fatal: meta.fatal,
                    probes: ProbeType::ALL
                        .into_iter()
                        .filter(|probe| check.supports(*probe))
                        .collect(),
                }
            })
            .collect();

        Self {
            identifier: registry.identifier().to_string(),
            display_name: registry.display_name().to_string(),
            checks,
        }
    }
}
