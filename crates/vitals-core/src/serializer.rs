//! Response serializers.
//!
//! A serializer turns the results of one evaluation plus the aggregate
//! "since" duration into a status code and body. The checker has already
//! decided which of the two branches applies.

use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use serde::Serialize;
use tracing::error;

use crate::context::CheckResults;
use crate::status::Status;

/// Serialized health response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthResponse {
    /// Encoded report, in the serializer's content type.
    pub body: Bytes,
    /// 200 when healthy, 409 when unhealthy, 500 if encoding failed.
    pub status: StatusCode,
}

impl HealthResponse {
    pub fn new(body: impl Into<Bytes>, status: StatusCode) -> Self {
        Self {
            body: body.into(),
            status,
        }
    }

    /// Body as UTF-8 text, lossy.
    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Strategy for rendering evaluation results on the wire.
pub trait ContextSerializer: Send + Sync {
    /// MIME type of the bodies this serializer produces.
    fn content_type(&self) -> &'static str;

    fn healthy(&self, results: &CheckResults, since: Duration) -> HealthResponse;

    fn unhealthy(&self, results: &CheckResults, since: Duration) -> HealthResponse;
}

/// Render a duration the way both serializers report "since".
///
/// Truncated to whole milliseconds: `10s`, `1.5s`, `250ms`.
pub fn render_since(since: Duration) -> String {
    let millis = u64::try_from(since.as_millis()).unwrap_or(u64::MAX);
    format!("{:?}", Duration::from_millis(millis))
}

/// Structured JSON serializer with per-check results.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct JsonBody<'a> {
    status: Status,
    since: String,
    results: &'a CheckResults,
}

impl JsonSerializer {
    fn render(results: &CheckResults, status: Status, since: Duration, code: StatusCode) -> HealthResponse {
        let body = JsonBody {
            status,
            since: render_since(since),
            results,
        };
        match serde_json::to_vec(&body) {
            Ok(bytes) => HealthResponse::new(bytes, code),
            Err(e) => {
                error!(error = %e, "failed to encode health response");
                HealthResponse::new(Bytes::new(), StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl ContextSerializer for JsonSerializer {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn healthy(&self, results: &CheckResults, since: Duration) -> HealthResponse {
        Self::render(results, Status::Healthy, since, StatusCode::OK)
    }

    fn unhealthy(&self, results: &CheckResults, since: Duration) -> HealthResponse {
        Self::render(results, Status::Unhealthy, since, StatusCode::CONFLICT)
    }
}

/// Plain-text serializer: `Healthy since 10s` / `Unhealthy since 10s`.
/// Per-check results are not rendered.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainSerializer;

impl ContextSerializer for PlainSerializer {
    fn content_type(&self) -> &'static str {
        "text/plain"
    }

    fn healthy(&self, _results: &CheckResults, since: Duration) -> HealthResponse {
        HealthResponse::new(format!("Healthy since {}", render_since(since)), StatusCode::OK)
    }

    fn unhealthy(&self, _results: &CheckResults, since: Duration) -> HealthResponse {
        HealthResponse::new(
            format!("Unhealthy since {}", render_since(since)),
            StatusCode::CONFLICT,
        )
    }
}
