use hubsockets::HubError;
use thiserror::Error;

/// Errors surfaced by the command facade and the dispatcher
#[derive(Error, Debug)]
pub enum FacadeError {
    #[error("Hub connection error: {0}")]
    Hub(#[from] HubError),

    /// The out-of-band configuration API answered with a non-success status
    #[error("Hub rejected the request: {0}")]
    HubRejected(String),

    /// A `result` frame came back with `success: false`
    #[error("Command failed ({code}): {message}")]
    CommandFailed { code: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode hub payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid name: {0}")]
    InvalidName(String),
}

impl FacadeError {
    /// Whether the call failed because the hub socket was unavailable
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, FacadeError::Hub(e) if e.is_connection_lost())
    }
}

pub type Result<T> = std::result::Result<T, FacadeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_lost_passthrough() {
        let err: FacadeError = HubError::ConnectionLost("closed".into()).into();
        assert!(err.is_connection_lost());
        assert!(FacadeError::from(HubError::NotReady).is_connection_lost());
        assert!(!FacadeError::HubRejected("nope".into()).is_connection_lost());
    }

    #[test]
    fn test_command_failed_display() {
        let err = FacadeError::CommandFailed {
            code: "not_found".into(),
            message: "Service not found.".into(),
        };
        assert_eq!(err.to_string(), "Command failed (not_found): Service not found.");
    }
}
