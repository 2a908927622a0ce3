//! Probe failure reasons.
//!
//! These never leave a check: every probe maps them to
//! `Status::Unhealthy` and logs the reason at debug level.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid uri {uri:?}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("connection to {address} failed: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("http handshake failed: {0}")]
    Handshake(#[source] hyper::Error),

    #[error("http request failed: {0}")]
    Request(#[source] hyper::Error),

    #[error("unexpected status {actual}, wanted {expected}")]
    UnexpectedStatus {
        expected: http::StatusCode,
        actual: http::StatusCode,
    },

    #[error("database probe failed: {0}")]
    Database(#[source] anyhow::Error),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("cancelled by shutdown")]
    Cancelled,
}
