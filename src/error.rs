//! Error types for launch-relay

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors that can occur while relaying launch events
#[derive(Debug, Error)]
pub enum RelayError {
    /// Queue connection failure or lost connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// Operation timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Backend temporarily unavailable or throttling
    #[error("Temporarily unavailable: {0}")]
    Unavailable(String),

    /// Publish rejected by the queue
    #[error("Failed to publish message to '{subject}': {reason}")]
    Publish {
        subject: String,
        reason: String,
    },

    /// Stream creation or management error
    #[error("Stream error: {0}")]
    Stream(String),

    /// Consumer creation or management error
    #[error("Consumer error: {0}")]
    Consumer(String),

    /// Acknowledgement failure
    #[error("Failed to acknowledge message: {0}")]
    Ack(String),

    /// Malformed payload
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// HTTP server failure
    #[error("Server error: {0}")]
    Server(String),
}

impl RelayError {
    /// Whether the failure is expected to clear up on retry
    ///
    /// Only infrastructure faults in the known transient set qualify:
    /// connection loss, timeouts, and temporary unavailability.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RelayError::Connection(_) | RelayError::Timeout(_) | RelayError::Unavailable(_)
        )
    }

    /// Short stable label for logs
    pub fn as_label(&self) -> &'static str {
        match self {
            RelayError::Connection(_) => "connection",
            RelayError::Timeout(_) => "timeout",
            RelayError::Unavailable(_) => "unavailable",
            RelayError::Publish { .. } => "publish",
            RelayError::Stream(_) => "stream",
            RelayError::Consumer(_) => "consumer",
            RelayError::Ack(_) => "ack",
            RelayError::Serialization(_) => "serialization",
            RelayError::Config(_) => "config",
            RelayError::Io(_) => "io",
            RelayError::TomlDe(_) => "toml",
            RelayError::Server(_) => "server",
        }
    }
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match &self {
            e if e.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            RelayError::Publish { .. }
            | RelayError::Stream(_)
            | RelayError::Consumer(_)
            | RelayError::Ack(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
