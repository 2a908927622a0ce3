//! TCP reachability probe.

use std::time::Duration;

use tokio::net::TcpStream;

use vitals_core::{BoxFuture, HealthContext, Probe, Status};

use crate::error::ProbeError;

/// Healthy when a TCP connection to `address` can be established.
///
/// Useful for dependencies without a client in this process, such as a
/// database reached only through a pooler.
#[derive(Debug, Clone)]
pub struct TcpCheck {
    address: String,
    timeout: Duration,
}

impl TcpCheck {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            timeout: Duration::from_secs(2),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn connect(&self) -> Result<(), ProbeError> {
        TcpStream::connect(&self.address)
            .await
            .map(drop)
            .map_err(|source| ProbeError::Connect {
                address: self.address.clone(),
                source,
            })
    }
}

impl Probe for TcpCheck {
    fn check(&self, ctx: HealthContext) -> BoxFuture<Status> {
        let this = self.clone();
        Box::pin(async move { crate::guarded(&this.address, &ctx, this.timeout, this.connect()).await })
    }
}

#[cfg(test)]
mod tests {
    use vitals_core::{HealthCheckBuilder, ServiceRegistry};

    use super::*;

    fn ctx() -> HealthContext {
        HealthContext::detached(ServiceRegistry::new())
    }

    #[tokio::test]
    async fn listening_port_is_healthy() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let status = TcpCheck::new(addr.to_string()).check(ctx()).await;
        assert_eq!(status, Status::Healthy);
    }

    #[tokio::test]
    async fn closed_port_is_unhealthy() {
        let status = TcpCheck::new("127.0.0.1:1")
            .timeout(Duration::from_millis(500))
            .check(ctx())
            .await;
        assert_eq!(status, Status::Unhealthy);
    }

    #[tokio::test]
    async fn unresolvable_host_is_unhealthy() {
        let status = TcpCheck::new("no-such-host.invalid:5432")
            .timeout(Duration::from_secs(1))
            .check(ctx())
            .await;
        assert_eq!(status, Status::Unhealthy);
    }

    #[tokio::test]
    async fn registers_through_builder() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let checks = HealthCheckBuilder::new()
            .add_probe("postgres", TcpCheck::new(addr.to_string()))
            .add_probe("redis", TcpCheck::new("127.0.0.1:1").timeout(Duration::from_millis(500)))
            .build();

        let ctx = checks.evaluate(ctx()).await;
        assert_eq!(ctx.results()["postgres"], Status::Healthy);
        assert_eq!(ctx.results()["redis"], Status::Unhealthy);
        assert!(ctx.has_any_unhealthy_or_lost());
    }
}
