//! Error types for the realtime session engine.
//!
//! The taxonomy splits along who can observe the failure:
//! - Configuration errors are returned synchronously to the caller.
//! - Transport errors are returned from `connect()` or delivered through
//!   the event stream when the connection dies mid-session.
//! - Protocol errors (malformed frames, unknown-id deltas) are delivered
//!   through the event stream and never halt the drain loop.
//! - Server-reported errors are forwarded verbatim.

use thiserror::Error;

/// Errors that can occur during realtime operations.
#[derive(Debug, Clone, Error)]
pub enum RealtimeError {
    /// Connection to the endpoint failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Operation requires a connected session
    #[error("Not connected")]
    NotConnected,

    /// Transport-level error
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The transport closed unexpectedly
    #[error("Transport closed: {0}")]
    TransportClosed(String),

    /// Decodable but invalid inbound frame
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Error event reported by the server, forwarded verbatim
    #[error("Server error [{error_type}]: {message}")]
    ServerError {
        /// Error type reported by the server
        error_type: String,
        /// Machine-readable error code, if any
        code: Option<String>,
        /// Human-readable message
        message: String,
        /// Parameter that caused the error, if any
        param: Option<String>,
    },
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

impl From<serde_json::Error> for RealtimeError {
    fn from(e: serde_json::Error) -> Self {
        RealtimeError::SerializationError(e.to_string())
    }
}
