use crate::core::codec::STATE_CHANGED;
use crate::traits::*;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Configuration for a HubConnection
///
/// Usually produced by the type-state builder (`hubsockets::builder()`), which
/// guarantees the endpoint and credentials are set.
pub struct ConnectionConfig {
    /// Hub WebSocket endpoint (ws:// or wss://)
    pub(crate) url: String,

    /// Credentials for the `auth_required` challenge
    pub(crate) auth: Arc<dyn AuthProvider>,

    /// Reconnection strategy (default: fixed 5s delay, unlimited)
    pub(crate) reconnect_strategy: Box<dyn ReconnectionStrategy>,

    /// Event category subscribed on every socket and forwarded to subscribers
    pub(crate) event_type: String,

    /// Shutdown flag - when false, the connection stops and never reconnects
    pub(crate) shutdown_flag: Arc<AtomicBool>,
}

impl ConnectionConfig {
    /// Configuration with default reconnect policy and `state_changed` events
    pub fn new(url: impl Into<String>, auth: impl AuthProvider + 'static) -> Self {
        Self {
            url: url.into(),
            auth: Arc::new(auth),
            reconnect_strategy: Box::new(FixedDelay::default()),
            event_type: STATE_CHANGED.to_string(),
            shutdown_flag: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Get a reference to the URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Tracked event category
    pub fn event_type(&self) -> &str {
        &self.event_type
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.url)
            .field("event_type", &self.event_type)
            .finish_non_exhaustive()
    }
}
