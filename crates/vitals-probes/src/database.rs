//! Driver-agnostic database probe.
//!
//! Any client can be checked by implementing [`DbConnection`] for a thin
//! wrapper around it. Each evaluation opens a fresh connection from the
//! factory and runs the test query.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use vitals_core::{BoxFuture, HealthContext, Probe, Status};

use crate::error::ProbeError;

pub type ConnFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Minimal connection surface the probe needs.
pub trait DbConnection: Send {
    fn open(&mut self) -> ConnFuture<'_, anyhow::Result<()>>;

    /// Execute `query` and discard the scalar result.
    fn execute_scalar<'a>(&'a mut self, query: &'a str) -> ConnFuture<'a, anyhow::Result<()>>;
}

type ConnectionFactory<C> = Arc<dyn Fn() -> anyhow::Result<C> + Send + Sync>;

/// Opens a connection and runs a test query (`SELECT 1;` by default).
pub struct DatabaseCheck<C> {
    factory: ConnectionFactory<C>,
    /// Name used in failure logs.
    label: String,
    test_query: String,
    timeout: Duration,
}

impl<C> Clone for DatabaseCheck<C> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            label: self.label.clone(),
            test_query: self.test_query.clone(),
            timeout: self.timeout,
        }
    }
}

impl<C: DbConnection + 'static> DatabaseCheck<C> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<C> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            label: "database".to_string(),
            test_query: "SELECT 1;".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    /// Name failures are logged under, usually the registered check name.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn test_query(mut self, query: impl Into<String>) -> Self {
        self.test_query = query.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn ping(&self) -> Result<(), ProbeError> {
        let mut conn = (self.factory)().map_err(ProbeError::Database)?;
        conn.open().await.map_err(ProbeError::Database)?;
        conn.execute_scalar(&self.test_query)
            .await
            .map_err(ProbeError::Database)
    }
}

impl<C: DbConnection + 'static> Probe for DatabaseCheck<C> {
    fn check(&self, ctx: HealthContext) -> BoxFuture<Status> {
        let this = self.clone();
        Box::pin(async move { crate::guarded(&this.label, &ctx, this.timeout, this.ping()).await })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use anyhow::anyhow;
    use vitals_core::ServiceRegistry;

    use super::*;

    #[derive(Clone, Copy)]
    enum Behaviour {
        Ok,
        FailOpen,
        FailQuery,
        Hang,
    }

    struct DummyConnection {
        behaviour: Behaviour,
        queries: Arc<Mutex<Vec<String>>>,
    }

    impl DbConnection for DummyConnection {
        fn open(&mut self) -> ConnFuture<'_, anyhow::Result<()>> {
            let behaviour = self.behaviour;
            Box::pin(async move {
                match behaviour {
                    Behaviour::FailOpen => Err(anyhow!("connection refused")),
                    _ => Ok(()),
                }
            })
        }

        fn execute_scalar<'a>(&'a mut self, query: &'a str) -> ConnFuture<'a, anyhow::Result<()>> {
            Box::pin(async move {
                self.queries.lock().unwrap().push(query.to_string());
                match self.behaviour {
                    Behaviour::FailQuery => Err(anyhow!("relation does not exist")),
                    Behaviour::Hang => {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Ok(())
                    }
                    _ => Ok(()),
                }
            })
        }
    }

    fn check(behaviour: Behaviour) -> (DatabaseCheck<DummyConnection>, Arc<Mutex<Vec<String>>>) {
        let queries = Arc::new(Mutex::new(Vec::new()));
        let log = queries.clone();
        let check = DatabaseCheck::new(move || {
            Ok(DummyConnection {
                behaviour,
                queries: log.clone(),
            })
        });
        (check, queries)
    }

    fn ctx() -> HealthContext {
        HealthContext::detached(ServiceRegistry::new())
    }

    #[tokio::test]
    async fn healthy_when_query_succeeds() {
        let (check, queries) = check(Behaviour::Ok);
        assert_eq!(check.check(ctx()).await, Status::Healthy);
        assert_eq!(*queries.lock().unwrap(), vec!["SELECT 1;".to_string()]);
    }

    #[tokio::test]
    async fn custom_test_query() {
        let (check, queries) = check(Behaviour::Ok);
        let check = check.test_query("SELECT version();");
        assert_eq!(check.check(ctx()).await, Status::Healthy);
        assert_eq!(*queries.lock().unwrap(), vec!["SELECT version();".to_string()]);
    }

    #[tokio::test]
    async fn open_failure_is_unhealthy() {
        let (check, queries) = check(Behaviour::FailOpen);
        assert_eq!(check.check(ctx()).await, Status::Unhealthy);
        assert!(queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn query_failure_is_unhealthy() {
        let (check, _) = check(Behaviour::FailQuery);
        assert_eq!(check.check(ctx()).await, Status::Unhealthy);
    }

    #[tokio::test]
    async fn factory_failure_is_unhealthy() {
        let check: DatabaseCheck<DummyConnection> =
            DatabaseCheck::new(|| Err(anyhow!("no driver configured")));
        assert_eq!(check.check(ctx()).await, Status::Unhealthy);
    }

    #[tokio::test]
    async fn failures_are_labelled_per_check() {
        let (orders, _) = check(Behaviour::FailQuery);
        let (billing, _) = check(Behaviour::FailQuery);
        let orders = orders.label("orders-db");
        let billing = billing.label("billing-db");

        assert_eq!(orders.label, "orders-db");
        assert_eq!(billing.clone().label, "billing-db");
        assert_eq!(check(Behaviour::Ok).0.label, "database");
        assert_eq!(orders.check(ctx()).await, Status::Unhealthy);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_query_times_out() {
        let (check, _) = check(Behaviour::Hang);
        let check = check.timeout(Duration::from_secs(1));
        assert_eq!(check.check(ctx()).await, Status::Unhealthy);
    }
}
