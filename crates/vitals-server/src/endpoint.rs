//! Request handling for the health endpoint.
//!
//! Per request: route → evaluate checks sequentially on a fresh context
//! → fold the outcome into the shared aggregate → serialize.

use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Method, Response, StatusCode};
use http_body_util::Full;
use tokio::sync::watch;
use tracing::debug;

use vitals_core::{
    ContextSerializer, HealthCheckOptions, HealthChecks, HealthContext, HealthResponse, HealthState,
    ServiceRegistry,
};

/// Everything a request needs to produce a health report.
///
/// Shared by all connection tasks; the only mutable piece is the
/// aggregate inside [`HealthState`], which serializes its own updates.
pub struct HealthEndpoint {
    options: HealthCheckOptions,
    checks: HealthChecks,
    registry: ServiceRegistry,
    state: Arc<HealthState>,
    serializer: Arc<dyn ContextSerializer>,
}

impl HealthEndpoint {
    pub fn new(
        options: HealthCheckOptions,
        checks: HealthChecks,
        registry: ServiceRegistry,
        state: Arc<HealthState>,
        serializer: Arc<dyn ContextSerializer>,
    ) -> Self {
        Self {
            options,
            checks,
            registry,
            state,
            serializer,
        }
    }

    pub fn options(&self) -> &HealthCheckOptions {
        &self.options
    }

    pub fn state(&self) -> &Arc<HealthState> {
        &self.state
    }

    /// Whether a request should be answered with a health report.
    pub fn routes(&self, method: &Method, target: &str) -> bool {
        method.as_str().eq_ignore_ascii_case("GET") && self.options.matches_path(target)
    }

    /// Run all checks and fold the result into the aggregate.
    pub async fn evaluate(&self, shutdown: watch::Receiver<bool>) -> HealthResponse {
        let ctx = HealthContext::new(self.registry.clone(), shutdown);
        let ctx = self.checks.evaluate(ctx).await;

        let state = self.state.observe(ctx.has_any_unhealthy_or_lost());
        ctx.with_state(state).serialize(self.serializer.as_ref())
    }

    /// Answer one request: a health report, or 404 without evaluating.
    pub async fn handle(
        &self,
        method: &Method,
        target: &str,
        shutdown: watch::Receiver<bool>,
    ) -> Response<Full<Bytes>> {
        if !self.routes(method, target) {
            debug!(%method, %target, "no route");
            return response(StatusCode::NOT_FOUND, None, Bytes::new());
        }

        let report = self.evaluate(shutdown).await;
        response(report.status, Some(self.serializer.content_type()), report.body)
    }
}

fn response(status: StatusCode, content_type: Option<&'static str>, body: Bytes) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(body));
    *resp.status_mut() = status;
    if let Some(content_type) = content_type {
        resp.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    resp
}
