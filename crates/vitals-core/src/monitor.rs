//! Monitored background workers.
//!
//! A [`MonitoredWorker`] wraps a [`MonitoredService`] and writes its
//! liveness into the [`ServiceRegistry`] at fixed lifecycle points:
//!
//! ```text
//! start()   → registry Healthy → on_start() → spawn execution
//! execution → registry Lost    → on_execute()
//! stop()    → registry Lost    → on_stop()  → signal + join execution
//! drop      → registry Lost
//! ```
//!
//! Once execution begins the worker is no longer confirmed running; it
//! has to report itself through [`WorkerContext::report_running`].

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::registry::ServiceRegistry;
use crate::status::Status;

/// Type name of `S` without its module path.
pub fn default_service_name<S>() -> String {
    let full = std::any::type_name::<S>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

/// Handle passed to a running worker.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    name: String,
    registry: ServiceRegistry,
    shutdown: watch::Receiver<bool>,
}

impl WorkerContext {
    pub fn service_name(&self) -> &str {
        &self.name
    }

    /// Mark this worker as running in the registry.
    pub fn report_running(&self) {
        self.registry.set(&self.name, Status::Healthy);
    }

    /// Report an explicit status for this worker.
    pub fn report(&self, status: Status) {
        self.registry.set(&self.name, status);
    }

    pub fn is_stopping(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Resolves when the worker is asked to stop.
    pub async fn stopped(&mut self) {
        let _ = self.shutdown.wait_for(|stop| *stop).await;
    }
}

/// A background service whose liveness is tracked in the registry.
pub trait MonitoredService: Send + Sync + Sized + 'static {
    /// Registry key. Defaults to the type name.
    fn service_name(&self) -> String {
        default_service_name::<Self>()
    }

    fn on_start(&self) -> impl Future<Output = anyhow::Result<()>> + Send {
        async { Ok(()) }
    }

    fn on_execute(&self, ctx: WorkerContext) -> impl Future<Output = anyhow::Result<()>> + Send {
        let _ = ctx;
        async { Ok(()) }
    }

    fn on_stop(&self) -> impl Future<Output = anyhow::Result<()>> + Send {
        async { Ok(()) }
    }
}

/// Runs a [`MonitoredService`] and keeps its registry entry current.
pub struct MonitoredWorker<S: MonitoredService> {
    service: Arc<S>,
    name: String,
    registry: ServiceRegistry,
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl<S: MonitoredService> MonitoredWorker<S> {
    pub fn new(service: S, registry: ServiceRegistry) -> Self {
        let name = service.service_name();
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            service: Arc::new(service),
            name,
            registry,
            shutdown_tx,
            handle: None,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.name
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Register as healthy, run `on_start`, then spawn execution.
    pub async fn start(&mut self) -> anyhow::Result<()> {
        self.registry.set_status(&self.name, true);
        self.service.on_start().await?;

        let ctx = WorkerContext {
            name: self.name.clone(),
            registry: self.registry.clone(),
            shutdown: self.shutdown_tx.subscribe(),
        };
        let service = self.service.clone();
        let registry = self.registry.clone();
        let name = self.name.clone();

        self.handle = Some(tokio::spawn(async move {
            registry.set_status(&name, false);
            debug!(service = %name, "worker execution started");
            if let Err(e) = service.on_execute(ctx).await {
                error!(service = %name, error = %e, "worker execution failed");
            }
            debug!(service = %name, "worker execution finished");
        }));

        info!(service = %self.name, "monitored worker started");
        Ok(())
    }

    /// Register as lost, run `on_stop`, then stop and join execution.
    pub async fn stop(&mut self) -> anyhow::Result<()> {
        self.registry.set_status(&self.name, false);
        let result = self.service.on_stop().await;

        self.shutdown_tx.send_replace(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!(service = %self.name, error = %e, "worker task aborted");
            }
        }

        info!(service = %self.name, "monitored worker stopped");
        result
    }
}

impl<S: MonitoredService> Drop for MonitoredWorker<S> {
    fn drop(&mut self) {
        self.registry.set_status(&self.name, false);
        self.shutdown_tx.send_replace(true);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
