//! Health endpoint options.
//!
//! ```toml
//! hostname = "*"
//! port = 8080
//! base_path = "/health"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Where the health endpoint listens and which path it answers on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckOptions {
    /// Interface to bind. `*` (or `+`) binds all interfaces.
    pub hostname: String,
    /// TCP port; `0` picks an ephemeral port.
    pub port: u16,
    /// Exact path answered with a health report, matched case-insensitively.
    pub base_path: String,
}

impl Default for HealthCheckOptions {
    fn default() -> Self {
        Self {
            hostname: "*".to_string(),
            port: 8080,
            base_path: "/health".to_string(),
        }
    }
}

impl HealthCheckOptions {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let options: HealthCheckOptions = toml::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hostname.trim().is_empty() {
            return Err(ConfigError::EmptyHostname);
        }
        if !self.base_path.starts_with('/') {
            return Err(ConfigError::BasePath(self.base_path.clone()));
        }
        Ok(())
    }

    /// Host part suitable for binding a socket.
    pub fn bind_host(&self) -> &str {
        match self.hostname.as_str() {
            "*" | "+" => "0.0.0.0",
            host => host,
        }
    }

    /// Whether a request target addresses the health endpoint.
    pub fn matches_path(&self, path_and_query: &str) -> bool {
        path_and_query.eq_ignore_ascii_case(&self.base_path)
    }
}
