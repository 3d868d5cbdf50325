//! # hubsockets
//!
//! A client for the home-automation hub's WebSocket API: one long-lived
//! connection that authenticates, multiplexes concurrent requests over a single
//! socket, delivers push events to subscribers, and reconnects on its own.
//!
//! ## Features
//!
//! - **Correlated requests**: Any number of concurrent callers, each resumed
//!   with exactly the result carrying its id
//! - **Ordered events**: Subscribers see events in hub-emission order on a
//!   dedicated dispatcher thread
//! - **Transparent reconnects**: Pending calls fail with `ConnectionLost`,
//!   the event subscription is re-issued on every new socket
//! - **Type-state builder**: Endpoint and credentials are checked at compile time

pub mod traits;
pub mod core;

// Re-export all traits
pub use traits::*;

// Re-export core functionality
pub use crate::core::{
    builder, codec, config, connection, connection_state, fanout, pending,
    builder::{states, HubConnectionBuilder},
    codec::{EntityState, ErrorBody, EventFrame, HubEvent, ResultFrame, StateChange},
    config::ConnectionConfig,
    connection::{HubConnection, Metrics},
    connection_state::ConnectionState,
};

/// Everything needed to open a connection and talk to the hub
pub mod prelude {
    pub use crate::core::codec::{EntityState, EventFrame, HubEvent, ResultFrame, StateChange};
    pub use crate::core::connection::HubConnection;
    pub use crate::core::connection_state::ConnectionState;
    pub use crate::traits::*;
}
