//! # hubsockets traits
//!
//! Seams of the hub connection client:
//!
//! - **AuthProvider**: Produce the access token for the handshake
//! - **ReconnectionStrategy**: Control reconnection behavior
//! - **EventSubscriber**: Receive push events in emission order
//! - **HubRequester**: The request/response primitive, for code built on top
//!   of a connection

pub mod auth;
pub mod error;
pub mod reconnect;
pub mod requester;
pub mod subscriber;

// Re-export commonly used types
pub use auth::{AuthProvider, TokenAuth};
pub use error::{HubError, Result};
pub use reconnect::{FixedDelay, NeverReconnect, ReconnectionStrategy, DEFAULT_RECONNECT_DELAY};
pub use requester::HubRequester;
pub use subscriber::EventSubscriber;
