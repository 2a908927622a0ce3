//! Per-evaluation check context.
//!
//! A `HealthContext` is built fresh for every request and never shared
//! between requests. Recording a result returns a new context; the
//! previous one is left untouched.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::watch;

use crate::registry::ServiceRegistry;
use crate::serializer::{ContextSerializer, HealthResponse};
use crate::state::AggregateState;
use crate::status::Status;

/// Results of one evaluation: check name → status.
pub type CheckResults = BTreeMap<String, Status>;

/// Immutable accumulator handed to every check.
#[derive(Debug, Clone)]
pub struct HealthContext {
    results: Arc<CheckResults>,
    registry: ServiceRegistry,
    shutdown: watch::Receiver<bool>,
    state: AggregateState,
}

impl HealthContext {
    /// Empty context with an `Unknown` aggregate entered now.
    pub fn new(registry: ServiceRegistry, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            results: Arc::new(CheckResults::new()),
            registry,
            shutdown,
            state: AggregateState::unknown(),
        }
    }

    /// Context whose cancellation signal never fires.
    pub fn detached(registry: ServiceRegistry) -> Self {
        let (_tx, rx) = watch::channel(false);
        Self::new(registry, rx)
    }

    /// Copy of this context with `name` set to `status`.
    pub fn set_item(&self, name: impl Into<String>, status: Status) -> Self {
        let mut results = CheckResults::clone(&self.results);
        results.insert(name.into(), status);
        Self {
            results: Arc::new(results),
            ..self.clone()
        }
    }

    /// Copy of this context carrying the given aggregate snapshot.
    pub fn with_state(&self, state: AggregateState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    pub fn results(&self) -> &CheckResults {
        &self.results
    }

    pub fn state(&self) -> AggregateState {
        self.state
    }

    /// Whether any recorded result is `Unhealthy` or `Lost`.
    pub fn has_any_unhealthy_or_lost(&self) -> bool {
        self.results.values().any(|status| status.is_failure())
    }

    /// Self-reported status of a monitored service; `Lost` if unknown.
    pub fn service_status(&self, service: &str) -> Status {
        self.registry.service_status(service)
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Whether the checker has been asked to shut down.
    pub fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Resolves once shutdown is signalled. Pends forever if the signal
    /// can no longer fire.
    pub async fn cancelled(&self) {
        let mut shutdown = self.shutdown.clone();
        if shutdown.wait_for(|stop| *stop).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Render the results with `serializer`, reporting how long the
    /// aggregate has held its current status.
    pub fn serialize(&self, serializer: &dyn ContextSerializer) -> HealthResponse {
        let since = self.state.since();
        if self.has_any_unhealthy_or_lost() {
            serializer.unhealthy(&self.results, since)
        } else {
            serializer.healthy(&self.results, since)
        }
    }
}
