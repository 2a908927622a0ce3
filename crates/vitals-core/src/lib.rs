//! vitals-core: health aggregation primitives.
//!
//! Checks evaluate against a per-request [`HealthContext`], background
//! workers report liveness into a shared [`ServiceRegistry`], and the
//! process-wide [`HealthState`] tracks since when the aggregate has held
//! its current verdict.
//!
//! # Architecture
//!
//! ```text
//! MonitoredWorker ──set_status──▶ ServiceRegistry ◀──service_status── checks
//!                                                                   │
//! request ─▶ HealthContext ─▶ HealthChecks::evaluate ─▶ results ────┘
//!                                   │
//!                                   ▼
//!                      HealthState::observe (hysteresis)
//!                                   │
//!                                   ▼
//!                 ContextSerializer (JSON / plain) ─▶ HealthResponse
//! ```

pub mod check;
pub mod config;
pub mod context;
pub mod error;
pub mod monitor;
pub mod registry;
pub mod serializer;
pub mod state;
pub mod status;

pub use check::{BoxFuture, HealthCheck, HealthCheckBuilder, HealthChecks, Probe};
pub use config::HealthCheckOptions;
pub use context::{CheckResults, HealthContext};
pub use error::ConfigError;
pub use monitor::{MonitoredService, MonitoredWorker, WorkerContext, default_service_name};
pub use registry::ServiceRegistry;
pub use serializer::{ContextSerializer, HealthResponse, JsonSerializer, PlainSerializer, render_since};
pub use state::{AggregateState, HealthState};
pub use status::Status;
