//! Check contract and registration.
//!
//! A check is a named async function of the context that yields a
//! [`Status`]. Checks own their failures: anything that goes wrong
//! inside a check must come back as `Unhealthy`, never as a panic.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::HealthContext;
use crate::monitor::{MonitoredService, default_service_name};
use crate::status::Status;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Function evaluating one check against a context.
pub type CheckFn = Arc<dyn Fn(HealthContext) -> BoxFuture<Status> + Send + Sync>;

/// A reusable probe that can be registered as a check.
pub trait Probe: Send + Sync + 'static {
    fn check(&self, ctx: HealthContext) -> BoxFuture<Status>;
}

/// A named check.
#[derive(Clone)]
pub struct HealthCheck {
    name: String,
    check: CheckFn,
}

impl HealthCheck {
    pub fn new<F, Fut>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(HealthContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Status> + Send + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(move |ctx| Box::pin(check(ctx))),
        }
    }

    pub fn from_probe(name: impl Into<String>, probe: impl Probe) -> Self {
        let probe = Arc::new(probe);
        Self {
            name: name.into(),
            check: Arc::new(move |ctx| probe.check(ctx)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn run(&self, ctx: HealthContext) -> Status {
        (self.check)(ctx).await
    }
}

impl fmt::Debug for HealthCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthCheck").field("name", &self.name).finish()
    }
}

/// Finalized, ordered set of checks. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct HealthChecks {
    checks: Arc<[HealthCheck]>,
}

impl HealthChecks {
    pub fn iter(&self) -> impl Iterator<Item = &HealthCheck> {
        self.checks.iter()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Run every check in registration order, one at a time, folding
    /// each result into the context.
    pub async fn evaluate(&self, mut ctx: HealthContext) -> HealthContext {
        for check in self.checks.iter() {
            let status = check.run(ctx.clone()).await;
            tracing::debug!(check = %check.name(), %status, "check evaluated");
            ctx = ctx.set_item(check.name(), status);
        }
        ctx
    }
}

/// Collects checks in registration order.
#[derive(Debug, Default)]
pub struct HealthCheckBuilder {
    checks: Vec<HealthCheck>,
}

impl HealthCheckBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an arbitrary async check.
    pub fn add_check<F, Fut>(mut self, name: impl Into<String>, check: F) -> Self
    where
        F: Fn(HealthContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Status> + Send + 'static,
    {
        self.checks.push(HealthCheck::new(name, check));
        self
    }

    /// Register a probe under `name`.
    pub fn add_probe(mut self, name: impl Into<String>, probe: impl Probe) -> Self {
        self.checks.push(HealthCheck::from_probe(name, probe));
        self
    }

    /// Report the registry status of worker type `S` under its default
    /// service name.
    pub fn add_monitored_service<S: MonitoredService>(self) -> Self {
        self.add_monitored_service_named(default_service_name::<S>())
    }

    /// Report the registry status of the service called `service`.
    pub fn add_monitored_service_named(self, service: impl Into<String>) -> Self {
        let service: String = service.into();
        let key = service.clone();
        self.add_check(service, move |ctx: HealthContext| {
            let status = ctx.service_status(&key);
            std::future::ready(status)
        })
    }

    pub fn add(mut self, check: HealthCheck) -> Self {
        self.checks.push(check);
        self
    }

    pub fn build(self) -> HealthChecks {
        HealthChecks {
            checks: self.checks.into(),
        }
    }
}
