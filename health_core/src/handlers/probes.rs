//! Liveness, readiness and discovery endpoints

use crate::health::{Aggregator, HealthReport, MetaDocument, ProbeType, QueryParams, Registry};
use axum::{
    extract::{RawQuery, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Router state shared by the probe handlers.
#[derive(Clone)]
pub struct ProbeState {
    pub registry: Arc<Registry>,
    pub aggregator: Arc<Aggregator>,
}

impl ProbeState {
    pub fn new(registry: Arc<Registry>, aggregator: Aggregator) -> Self {
        Self {
            registry,
            aggregator: Arc::new(aggregator),
        }
    }

    /// Evaluate one probe. Readiness answers the fixed shutdown document
    /// without running any check once the registry is draining.
    pub async fn evaluate(&self, probe: ProbeType, params: &QueryParams) -> HealthReport {
        if probe == ProbeType::Readiness && self.registry.is_shutting_down() {
            info!("Readiness probe short-circuited, shutdown in progress");
            return HealthReport::shutting_down(self.registry.display_name());
        }

        self.aggregator.run(&self.registry, probe, params).await
    }
}

/// Bind the probe endpoints under `prefix`. Each path also answers with a
/// trailing slash.
pub fn probe_routes(prefix: &str, expose_meta: bool) -> Router<ProbeState> {
    let prefix = prefix.trim_end_matches('/');

    let mut router = Router::new()
        .route(&format!("{}/healthz", prefix), get(handle_liveness))
        .route(&format!("{}/healthz/", prefix), get(handle_liveness))
        .route(&format!("{}/readyz", prefix), get(handle_readiness))
        .route(&format!("{}/readyz/", prefix), get(handle_readiness));

    if expose_meta {
        router = router
            .route(&format!("{}/healthz/meta", prefix), get(handle_meta))
            .route(&format!("{}/healthz/meta/", prefix), get(handle_meta));
    }

    router
}

pub async fn handle_liveness(State(state): State<ProbeState>, RawQuery(query): RawQuery) -> Response {
    info!(probe = "liveness", "Probe requested");
    respond(&state, ProbeType::Liveness, query).await
}

pub async fn handle_readiness(State(state): State<ProbeState>, RawQuery(query): RawQuery) -> Response {
    info!(probe = "readiness", "Probe requested");
    respond(&state, ProbeType::Readiness, query).await
}

pub async fn handle_meta(State(state): State<ProbeState>) -> impl IntoResponse {
    info!(checks = state.registry.len(), "Listing registered checks");
    Json(MetaDocument::from_registry(&state.registry))
}

async fn respond(state: &ProbeState, probe: ProbeType, query: Option<String>) -> Response {
    let params = QueryParams::parse(query.as_deref());
    let report = state.evaluate(probe, &params).await;
    let status_code = report.http_status();

    if report.status.is_degraded() {
        warn!(probe = %probe, status = %report.status, code = status_code.as_u16(), "Probe reporting degraded health");
    }

    (status_code, Json(report)).into_response()
}
