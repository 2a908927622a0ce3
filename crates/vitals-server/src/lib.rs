//! vitals-server: the health endpoint.
//!
//! Serves `GET {base_path}` over HTTP/1.1. Every matching request runs
//! the registered checks in order against a fresh context, updates the
//! shared aggregate state, and answers with the configured serializer's
//! body: 200 when healthy, 409 when any check is `Unhealthy` or `Lost`.
//! Anything else gets an empty 404 without running checks.
//!
//! # Architecture
//!
//! ```text
//! TcpListener ── accept ──▶ task per connection (hyper http1)
//!                                 │
//!                                 ▼
//!                          HealthEndpoint::handle
//!                            ├── route (GET + base path) ── else 404
//!                            ├── HealthChecks::evaluate (sequential)
//!                            ├── HealthState::observe (hysteresis)
//!                            └── ContextSerializer → status + body
//! ```

pub mod endpoint;
pub mod server;

pub use endpoint::HealthEndpoint;
pub use server::{BoundChecker, HealthChecker};
