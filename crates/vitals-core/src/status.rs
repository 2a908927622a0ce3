//! Health status values shared by checks, the registry, and the aggregate.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Health of a single check or service.
///
/// Each variant keeps a distinct flag value (`bits`) so results can be
/// exchanged with systems that speak the flag encoding, but aggregation
/// only ever looks at [`Status::is_failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    /// No verdict yet; the aggregate starts here.
    #[default]
    Unknown,
    /// Working as expected.
    Healthy,
    /// Failing. Counts against the aggregate.
    Unhealthy,
    /// Degraded but expected to recover on its own. Not a failure.
    Recoverable,
    /// Stopped, or never reported in. Counts against the aggregate.
    Lost,
}

impl Status {
    /// Flag value of this status.
    pub const fn bits(self) -> u8 {
        match self {
            Status::Unknown => 0,
            Status::Healthy => 1,
            Status::Unhealthy => 1 << 1,
            Status::Recoverable => 1 << 2,
            Status::Lost => 1 << 3,
        }
    }

    /// Decode a single flag value. Combined flags are rejected.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Status::Unknown),
            1 => Some(Status::Healthy),
            2 => Some(Status::Unhealthy),
            4 => Some(Status::Recoverable),
            8 => Some(Status::Lost),
            _ => None,
        }
    }

    /// Whether this status makes the aggregate unhealthy.
    pub const fn is_failure(self) -> bool {
        matches!(self, Status::Unhealthy | Status::Lost)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Unknown => "Unknown",
            Status::Healthy => "Healthy",
            Status::Unhealthy => "Unhealthy",
            Status::Recoverable => "Recoverable",
            Status::Lost => "Lost",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unhealthy_and_lost_fail() {
        assert!(Status::Unhealthy.is_failure());
        assert!(Status::Lost.is_failure());
        assert!(!Status::Healthy.is_failure());
        assert!(!Status::Unknown.is_failure());
        assert!(!Status::Recoverable.is_failure());
    }

    #[test]
    fn flag_values_match_wire_encoding() {
        assert_eq!(Status::Unknown.bits(), 0);
        assert_eq!(Status::Healthy.bits(), 1);
        assert_eq!(Status::Unhealthy.bits(), 2);
        assert_eq!(Status::Recoverable.bits(), 4);
        assert_eq!(Status::Lost.bits(), 8);
    }

    #[test]
    fn combined_flags_are_rejected() {
        assert_eq!(Status::from_bits(8), Some(Status::Lost));
        assert_eq!(Status::from_bits(2 | 8), None);
        assert_eq!(Status::from_bits(16), None);
    }

    #[test]
    fn serializes_as_variant_name() {
        let json = serde_json::to_string(&Status::Recoverable).unwrap();
        assert_eq!(json, "\"Recoverable\"");
        assert_eq!(Status::Lost.to_string(), "Lost");
    }
}
