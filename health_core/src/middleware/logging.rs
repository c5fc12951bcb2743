//! Access logging for probe requests

use axum::body::Body;
use http::{Request, Response};
use std::time::Duration;
use tower_http::classify::{ServerErrorsAsFailures, ServerErrorsFailureClass, SharedClassifier};
use tower_http::trace::{
    DefaultOnBodyChunk, DefaultOnEos, MakeSpan, OnFailure, OnRequest, OnResponse, TraceLayer,
};
use tracing::{info_span, Span};

pub type ProbeTraceLayer = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    ProbeSpan,
    ProbeRequestLog,
    ProbeResponseLog,
    DefaultOnBodyChunk,
    DefaultOnEos,
    ProbeFailureLog,
>;

/// Span per request. A 503 is an expected health answer, so it is logged
/// as a warning rather than an error.
pub fn logging_layer() -> ProbeTraceLayer {
    TraceLayer::new_for_http()
        .make_span_with(ProbeSpan)
        .on_request(ProbeRequestLog)
        .on_response(ProbeResponseLog)
        .on_failure(ProbeFailureLog)
}

#[derive(Debug, Clone, Copy)]
pub struct ProbeSpan;

impl MakeSpan<Body> for ProbeSpan {
    fn make_span(&mut self, request: &Request<Body>) -> Span {
        info_span!(
            "probe_request",
            method = %request.method(),
            path = %request.uri().path(),
            query = ?request.uri().query(),
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProbeRequestLog;

impl OnRequest<Body> for ProbeRequestLog {
    fn on_request(&mut self, request: &Request<Body>, _span: &Span) {
        tracing::debug!(method = %request.method(), path = %request.uri().path(), "probe request received");
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProbeResponseLog;

impl OnResponse<Body> for ProbeResponseLog {
    fn on_response(self, response: &Response<Body>, latency: Duration, _span: &Span) {
        let status = response.status().as_u16();
        let latency_ms = latency.as_millis() as u64;

        if response.status().is_success() {
            tracing::info!(status, latency_ms, "probe answered");
        } else {
            tracing::warn!(status, latency_ms, "probe answered unhealthy");
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProbeFailureLog;

impl OnFailure<ServerErrorsFailureClass> for ProbeFailureLog {
    fn on_failure(&mut self, failure: ServerErrorsFailureClass, latency: Duration, _span: &Span) {
        tracing::debug!(
            latency_ms = latency.as_millis() as u64,
            classification = %failure,
            "probe request classified as failure"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_layer_wraps_router() {
        let app = Router::new()
            .route("/ok", get(|| async { "ok" }))
            .layer(logging_layer());

        let request = Request::builder().uri("/ok").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
    }
}
