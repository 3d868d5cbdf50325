//! # hubsockets core
//!
//! The hub connection and the pieces it owns:
//!
//! - **codec**: JSON envelope of the hub protocol (stateless)
//! - **pending**: correlation id → waiting caller
//! - **fanout**: ordered delivery of push events to subscribers
//! - **connection**: handshake state machine, receive loop, reconnect policy
//!
//! ## Example
//!
//! ```rust,ignore
//! use hubsockets::prelude::*;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let connection = hubsockets::builder()
//!         .url("ws://homeassistant.local:8123/api/websocket")
//!         .token(std::env::var("HA_TOKEN").unwrap_or_default())
//!         .build()
//!         .await?;
//!
//!     connection.subscribe(|frame: &EventFrame| {
//!         println!("event: {}", frame.event.event_type);
//!     });
//!
//!     connection.wait_ready().await;
//!     let states = connection.request(json!({"type": "get_states"})).await?;
//!     println!("{} entities", states.result.as_array().map_or(0, |a| a.len()));
//!
//!     connection.shutdown().await
//! }
//! ```

pub mod builder;
pub mod codec;
pub mod config;
pub mod connection;
pub mod connection_state;
pub mod fanout;
pub mod pending;

// Re-export main types
pub use builder::{states, HubConnectionBuilder};
pub use codec::{
    EntityState, ErrorBody, EventFrame, HubEvent, InboundFrame, OutboundFrame, ResultFrame,
    StateChange, STATE_CHANGED,
};
pub use config::ConnectionConfig;
pub use connection::{HubConnection, Metrics};
pub use connection_state::{
    AtomicConnectionState, AtomicMetrics, AtomicSubscriptionState, ConnectionState,
};
pub use fanout::EventFanout;
pub use pending::PendingCalls;

// Re-export traits for convenience
pub use crate::traits::*;

/// Create a new hub connection builder
///
/// # Example
/// ```ignore
/// let connection = hubsockets::builder()
///     .url("ws://homeassistant.local:8123/api/websocket")
///     .token(token)
///     .reconnect_delay(Duration::from_secs(5))
///     .build()
///     .await?;
/// ```
pub fn builder() -> HubConnectionBuilder<builder::states::NoUrl, builder::states::NoAuth> {
    HubConnectionBuilder::new()
}
