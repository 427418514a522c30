//! Centralized configuration for the Arcana service.
//!
//! Constants for the RPC link, job retention, and submission bounds, plus
//! the reading mode enum both processes validate against.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the front-door ⇄ worker RPC link.
pub struct RpcConfig;

impl RpcConfig {
    /// Default worker port; the front door often reaches it through an
    /// SSH tunnel that terminates on localhost.
    pub const DEFAULT_PORT: u16 = 5555;

    /// Largest frame either side will accept.
    pub const MAX_FRAME_SIZE: usize = 4 * 1024 * 1024;

    /// Timeout covering one whole call: connect, send, and receive.
    /// Generation can legitimately take minutes.
    pub const CALL_TIMEOUT: Duration = Duration::from_secs(600);

    /// Maximum connection handlers in flight on the worker.
    pub const MAX_CONNECTIONS: usize = 32;

    /// Shortest question the worker will run inference for.
    pub const MIN_QUESTION_CHARS: usize = 3;
}

/// Configuration for the in-memory job table.
pub struct JobConfig;

impl JobConfig {
    /// How long a finished job stays pollable before eviction.
    pub const RETENTION: Duration = Duration::from_secs(3600);
}

/// Submission bounds enforced by the HTTP front door.
pub struct WebConfig;

impl WebConfig {
    pub const DEFAULT_PORT: u16 = 8080;
    pub const QUESTION_MIN_CHARS: usize = 3;
    pub const QUESTION_MAX_CHARS: usize = 5000;
    pub const INFORMATION_MAX_CHARS: usize = 5000;
}

/// The focus a reading is asked for.
///
/// Serialized lowercase on the wire; raw strings are validated through
/// [`Mode::from_str`] at both edges before anything trusts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    General,
    Love,
    Career,
    Money,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::General, Mode::Love, Mode::Career, Mode::Money];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::General => "general",
            Mode::Love => "love",
            Mode::Career => "career",
            Mode::Money => "money",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "general" => Some(Mode::General),
            "love" => Some(Mode::Love),
            "career" => Some(Mode::Career),
            "money" => Some(Mode::Money),
            _ => None,
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::General
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_roundtrip() {
        for mode in Mode::ALL {
            let s = mode.as_str();
            let parsed = Mode::from_str(s).expect("Should parse");
            assert_eq!(mode, parsed);
        }
    }

    #[test]
    fn test_mode_rejects_unknown() {
        assert!(Mode::from_str("bogus").is_none());
        assert!(Mode::from_str("").is_none());
    }

    #[test]
    fn test_mode_wire_format_is_lowercase() {
        let json = serde_json::to_string(&Mode::Love).unwrap();
        assert_eq!(json, "\"love\"");
    }

    #[test]
    fn test_timeouts_are_reasonable() {
        assert!(RpcConfig::CALL_TIMEOUT > Duration::from_secs(60));
        assert!(JobConfig::RETENTION > Duration::ZERO);
    }
}
