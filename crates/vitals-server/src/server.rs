//! Health checker listener.
//!
//! `HealthChecker` binds the configured address and serves the health
//! endpoint over HTTP/1.1 until the shutdown signal fires. Each accepted
//! connection is handled on its own task, so a slow evaluation never
//! blocks the next accept.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use vitals_core::{ContextSerializer, HealthCheckOptions, HealthChecks, HealthState, ServiceRegistry};

use crate::endpoint::HealthEndpoint;

/// Unbound health checker.
pub struct HealthChecker {
    endpoint: HealthEndpoint,
}

impl HealthChecker {
    /// Create a checker with a fresh aggregate state.
    pub fn new(
        options: HealthCheckOptions,
        checks: HealthChecks,
        registry: ServiceRegistry,
        serializer: Arc<dyn ContextSerializer>,
    ) -> Self {
        Self::with_state(options, checks, registry, serializer, Arc::new(HealthState::new()))
    }

    /// Create a checker around an aggregate state owned by the caller.
    pub fn with_state(
        options: HealthCheckOptions,
        checks: HealthChecks,
        registry: ServiceRegistry,
        serializer: Arc<dyn ContextSerializer>,
        state: Arc<HealthState>,
    ) -> Self {
        Self {
            endpoint: HealthEndpoint::new(options, checks, registry, state, serializer),
        }
    }

    pub fn state(&self) -> &Arc<HealthState> {
        self.endpoint.state()
    }

    /// Bind the listening socket.
    pub async fn bind(self) -> anyhow::Result<BoundChecker> {
        let options = self.endpoint.options();
        let host = options.bind_host().to_string();
        let port = options.port;

        let listener = TcpListener::bind((host.as_str(), port))
            .await
            .with_context(|| format!("failed to bind health checker on {host}:{port}"))?;
        let local_addr = listener.local_addr().context("failed to read bound address")?;

        info!(addr = %local_addr, path = %options.base_path, "health checker listening");
        Ok(BoundChecker {
            listener,
            local_addr,
            endpoint: Arc::new(self.endpoint),
        })
    }

    /// Bind and serve until shutdown.
    ///
    /// Startup failures are logged and end the checker without
    /// propagating, so the host process keeps running without the
    /// endpoint.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let bound = match self.bind().await {
            Ok(bound) => bound,
            Err(e) => {
                error!(error = ?e, "health checker failed to start");
                return;
            }
        };
        bound.serve(shutdown).await;
    }
}

/// A checker with its socket bound, ready to serve.
pub struct BoundChecker {
    listener: TcpListener,
    local_addr: SocketAddr,
    endpoint: Arc<HealthEndpoint>,
}

impl BoundChecker {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> &Arc<HealthState> {
        self.endpoint.state()
    }

    /// Accept connections until the shutdown signal fires, then close
    /// the listening socket. Open connections finish their in-flight
    /// request and are then closed.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    let (stream, peer_addr) = match accept_result {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(error = %e, "health checker accept failed");
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                            continue;
                        }
                    };
                    tokio::spawn(serve_connection(
                        stream,
                        peer_addr,
                        self.endpoint.clone(),
                        shutdown.clone(),
                    ));
                }
                _ = shutdown_signalled(&mut shutdown) => {
                    info!(addr = %self.local_addr, "health checker shutting down");
                    break;
                }
            }
        }
    }
}

/// Pause after a failed accept so persistent errors (e.g. EMFILE) do not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Resolves once shutdown is signalled or its sender is gone.
async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn serve_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    endpoint: Arc<HealthEndpoint>,
    mut shutdown: watch::Receiver<bool>,
) {
    let io = TokioIo::new(stream);
    let request_shutdown = shutdown.clone();
    let svc = service_fn(move |req: Request<Incoming>| {
        let endpoint = endpoint.clone();
        let shutdown = request_shutdown.clone();
        async move {
            let target = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or_else(|| req.uri().path());
            let resp = endpoint.handle(req.method(), target, shutdown).await;
            Ok::<_, Infallible>(resp)
        }
    });

    let conn = http1::Builder::new().serve_connection(io, svc);
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        _ = shutdown_signalled(&mut shutdown) => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };
    if let Err(e) = result {
        debug!(%peer_addr, error = %e, "health connection error");
    }
}
