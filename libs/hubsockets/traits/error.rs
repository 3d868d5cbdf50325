use thiserror::Error;

/// Main error type for hubsockets
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    /// The socket closed while the call was pending (or while it was being sent)
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// A request was issued before the handshake reached `Ready`
    #[error("Connection not ready: handshake has not completed")]
    NotReady,

    /// Malformed or unexpected frame from the hub
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Request payload cannot be framed (must be a JSON object)
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// WebSocket transport error (connect, read or write)
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Credentials could not be produced or were refused by the hub
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl HubError {
    /// True for every failure that means "the session is not there".
    ///
    /// A request attempted before `Ready` is a precondition violation of the
    /// same class as losing the socket mid-call, so callers can treat both the
    /// same way.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, HubError::ConnectionLost(_) | HubError::NotReady)
    }
}

/// Result type for hubsockets operations
pub type Result<T> = std::result::Result<T, HubError>;
