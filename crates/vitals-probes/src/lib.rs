//! vitals-probes: reference checks for common dependencies.
//!
//! Every probe implements [`vitals_core::Probe`] and can be registered
//! with [`vitals_core::HealthCheckBuilder::add_probe`]. Probes absorb
//! their own failures: connection errors, timeouts and shutdown all
//! come back as `Status::Unhealthy`.
//!
//! | Probe | Healthy when |
//! |---|---|
//! | [`ApiCheck`] | the endpoint answers with the expected status |
//! | [`DatabaseCheck`] | a fresh connection opens and runs the test query |
//! | [`TcpCheck`] | a TCP connection to the address succeeds |

pub mod api;
pub mod database;
pub mod error;
pub mod tcp;

pub use api::ApiCheck;
pub use database::{DatabaseCheck, DbConnection};
pub use error::ProbeError;
pub use tcp::TcpCheck;

use std::future::Future;
use std::time::Duration;

use tracing::debug;
use vitals_core::{HealthContext, Status};

/// Run a fallible probe under a timeout and the context's shutdown
/// signal, folding every failure into `Unhealthy`.
pub(crate) async fn guarded<F>(name: &str, ctx: &HealthContext, timeout: Duration, probe: F) -> Status
where
    F: Future<Output = Result<(), ProbeError>>,
{
    let outcome = tokio::select! {
        result = tokio::time::timeout(timeout, probe) => {
            result.unwrap_or(Err(ProbeError::Timeout(timeout)))
        }
        _ = ctx.cancelled() => Err(ProbeError::Cancelled),
    };

    match outcome {
        Ok(()) => Status::Healthy,
        Err(e) => {
            debug!(probe = name, error = %e, "probe failed");
            Status::Unhealthy
        }
    }
}
