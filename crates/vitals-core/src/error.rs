//! Error types for vitals configuration.

use thiserror::Error;

/// Errors raised while loading or validating endpoint options.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid base path {0:?}: must start with '/'")]
    BasePath(String),

    #[error("hostname must not be empty")]
    EmptyHostname,
}
