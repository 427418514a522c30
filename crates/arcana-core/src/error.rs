//! Error types for the Arcana service.
//!
//! One enum covers both processes: transport and RPC failures on the link,
//! validation rejections at the edges, and inference failures inside the
//! worker. Every failure a job can hit ends up stringified into a
//! `{ok:false, error}` result rather than crossing a process boundary.

use thiserror::Error;

/// Main error type for Arcana operations.
#[derive(Debug, Error)]
pub enum ArcanaError {
    // Wire-level errors: framing, truncation, undecodable payloads
    #[error("transport error: {message}")]
    Transport { message: String },

    // RPC call errors: connect, send/receive, peer gone
    #[error("rpc failed: {message}")]
    Rpc { message: String },

    #[error("rpc timed out after {0:?}")]
    Timeout(std::time::Duration),

    // Validation errors
    #[error("validation error for {field}: {message}")]
    Validation { field: String, message: String },

    // Worker-side inference errors
    #[error("inference failed: {message}")]
    Inference { message: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("configuration error: {message}")]
    Config { message: String },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for Arcana operations.
pub type Result<T> = std::result::Result<T, ArcanaError>;

impl From<std::io::Error> for ArcanaError {
    fn from(err: std::io::Error) -> Self {
        ArcanaError::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for ArcanaError {
    fn from(err: serde_json::Error) -> Self {
        ArcanaError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl ArcanaError {
    /// Create a transport error with the given message.
    pub fn transport(message: impl Into<String>) -> Self {
        ArcanaError::Transport {
            message: message.into(),
        }
    }

    /// Create an RPC error with the given message.
    pub fn rpc(message: impl Into<String>) -> Self {
        ArcanaError::Rpc {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ArcanaError::transport("socket closed mid-frame");
        assert_eq!(err.to_string(), "transport error: socket closed mid-frame");

        let err = ArcanaError::Validation {
            field: "mode".into(),
            message: "unknown mode".into(),
        };
        assert_eq!(err.to_string(), "validation error for mode: unknown mode");
    }

    #[test]
    fn test_io_error_conversion_keeps_kind_visible() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: ArcanaError = io.into();
        assert!(err.to_string().contains("refused"));
    }
}
