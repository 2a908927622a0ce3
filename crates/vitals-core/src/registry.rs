//! Service health registry for self-reported liveness of background workers.
//!
//! Workers write their own status here at lifecycle transitions; checks
//! read it back during evaluation. Absence of an entry is not an error:
//! a service that never reported is treated exactly like one that went
//! away ([`Status::Lost`]).

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::status::Status;

/// Concurrent `service name → status` map.
///
/// Cloning is cheap and every clone shares the same entries, so the
/// registry is handed explicitly to each worker and to the checker.
/// Writes are last-writer-wins per key.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    entries: Arc<RwLock<HashMap<String, Status>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a worker as running (`Healthy`) or not (`Lost`).
    pub fn set_status(&self, service: &str, is_running: bool) {
        let status = if is_running {
            Status::Healthy
        } else {
            Status::Lost
        };
        self.set(service, status);
    }

    /// Upsert an explicit status for a service.
    pub fn set(&self, service: &str, status: Status) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let previous = entries.insert(service.to_string(), status);
        if previous != Some(status) {
            debug!(%service, %status, "service status changed");
        }
    }

    /// Raw lookup; `None` when the service never reported.
    pub fn get(&self, service: &str) -> Option<Status> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(service).copied()
    }

    /// Status of a service, defaulting to `Lost` when absent.
    pub fn service_status(&self, service: &str) -> Status {
        self.get(service).unwrap_or(Status::Lost)
    }

    /// Copy of all entries at this instant.
    pub fn snapshot(&self) -> HashMap<String, Status> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_service_is_lost() {
        let registry = ServiceRegistry::new();
        assert_eq!(registry.get("never-registered"), None);
        assert_eq!(registry.service_status("never-registered"), Status::Lost);
    }

    #[test]
    fn set_status_maps_running_flag() {
        let registry = ServiceRegistry::new();
        registry.set_status("worker", true);
        assert_eq!(registry.service_status("worker"), Status::Healthy);

        registry.set_status("worker", false);
        assert_eq!(registry.service_status("worker"), Status::Lost);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn clones_share_entries() {
        let registry = ServiceRegistry::new();
        let handle = registry.clone();
        handle.set("ingest", Status::Recoverable);
        assert_eq!(registry.get("ingest"), Some(Status::Recoverable));
    }

    #[test]
    fn concurrent_writers_do_not_lose_keys() {
        let registry = ServiceRegistry::new();
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for j in 0..100 {
                        registry.set_status(&format!("svc-{i}-{j}"), j % 2 == 0);
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(registry.len(), 800);
        assert_eq!(registry.service_status("svc-3-4"), Status::Healthy);
        assert_eq!(registry.service_status("svc-3-5"), Status::Lost);
    }
}
