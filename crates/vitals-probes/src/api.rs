//! Upstream HTTP API probe.

use std::time::Duration;

use bytes::Bytes;
use http::{Method, Request, StatusCode, Uri};
use http_body_util::Empty;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tracing::debug;

use vitals_core::{BoxFuture, HealthContext, Probe, Status};

use crate::error::ProbeError;

/// Sends one HTTP/1.1 request and compares the response status.
///
/// Only plain `http://` endpoints are supported.
#[derive(Debug, Clone)]
pub struct ApiCheck {
    uri: String,
    method: Method,
    expected: StatusCode,
    timeout: Duration,
}

impl ApiCheck {
    /// `GET uri`, healthy on `200 OK`, 5 second timeout.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            method: Method::GET,
            expected: StatusCode::OK,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn expect_status(mut self, status: StatusCode) -> Self {
        self.expected = status;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Perform the request and return the response status.
    pub async fn request(&self) -> Result<StatusCode, ProbeError> {
        let uri: Uri = self.uri.parse().map_err(|e: http::uri::InvalidUri| ProbeError::InvalidUri {
            uri: self.uri.clone(),
            reason: e.to_string(),
        })?;
        let (host, port) = target(&uri).map_err(|reason| ProbeError::InvalidUri {
            uri: self.uri.clone(),
            reason: reason.to_string(),
        })?;
        let address = format!("{host}:{port}");

        let stream = TcpStream::connect(&address)
            .await
            .map_err(|source| ProbeError::Connect {
                address: address.clone(),
                source,
            })?;

        let io = TokioIo::new(stream);
        let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
            .await
            .map_err(ProbeError::Handshake)?;

        // Drive the connection in the background.
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "api probe connection closed with error");
            }
        });

        let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
        let req = Request::builder()
            .method(self.method.clone())
            .uri(path)
            .header(http::header::HOST, address.as_str())
            .header(http::header::USER_AGENT, "vitals-probe/0.1")
            .body(Empty::<Bytes>::new())
            .map_err(|e| ProbeError::InvalidUri {
                uri: self.uri.clone(),
                reason: e.to_string(),
            })?;

        let resp = sender.send_request(req).await.map_err(ProbeError::Request)?;
        Ok(resp.status())
    }

    async fn verify(&self) -> Result<(), ProbeError> {
        let actual = self.request().await?;
        if actual == self.expected {
            Ok(())
        } else {
            Err(ProbeError::UnexpectedStatus {
                expected: self.expected,
                actual,
            })
        }
    }
}

impl Probe for ApiCheck {
    fn check(&self, ctx: HealthContext) -> BoxFuture<Status> {
        let this = self.clone();
        Box::pin(async move { crate::guarded(&this.uri, &ctx, this.timeout, this.verify()).await })
    }
}

/// Host and port of an `http` URI.
fn target(uri: &Uri) -> Result<(&str, u16), &'static str> {
    match uri.scheme_str() {
        Some("http") | None => {}
        Some(_) => return Err("only http:// is supported"),
    }
    let host = uri.host().ok_or("missing host")?;
    Ok((host, uri.port_u16().unwrap_or(80)))
}
