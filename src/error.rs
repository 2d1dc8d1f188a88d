//! Error types for the Flag Frenzy client.

use thiserror::Error;

/// Errors that can occur when using the Flag Frenzy client.
#[derive(Debug, Error)]
pub enum FlagFrenzyError {
    /// Failed to send a message through the socket transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the socket transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The socket transport was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted an operation that requires an active connection, but the client is not connected.
    #[error("not connected to server")]
    NotConnected,

    /// No bearer credential is available for an authenticated request.
    #[error("no session credential available")]
    MissingCredential,

    /// An HTTP request failed before a response was received.
    #[error("request error: {0}")]
    Request(String),

    /// The server answered an HTTP request with an error status.
    #[error("server returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body, if any.
        message: String,
    },

    /// The requested entity does not exist (HTTP 404).
    #[error("not found")]
    NotFound,

    /// The session credential was rejected (HTTP 401); the session has been invalidated.
    #[error("session expired")]
    SessionExpired,

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlagFrenzyError {
    /// Returns `true` for errors that should surface to the player as a
    /// transient notice rather than ending the session.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::SessionExpired)
    }
}

/// A specialized [`Result`] type for Flag Frenzy client operations.
pub type Result<T> = std::result::Result<T, FlagFrenzyError>;
