pub mod states;

use crate::connection::HubConnection;
use crate::config::ConnectionConfig;
use crate::core::codec::STATE_CHANGED;
use crate::traits::*;
use states::*;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Type-state builder for HubConnection
///
/// The type system enforces that the endpoint and the credentials are set
/// before the connection can be built.
pub struct HubConnectionBuilder<U, A>
where
    U: UrlState,
    A: AuthState,
{
    _state: TypeState<U, A>,
    url: Option<String>,
    auth: Option<Arc<dyn AuthProvider>>,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    event_type: String,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl HubConnectionBuilder<NoUrl, NoAuth> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            url: None,
            auth: None,
            reconnect_strategy: None,
            event_type: STATE_CHANGED.to_string(),
            shutdown_flag: None,
        }
    }
}

impl Default for HubConnectionBuilder<NoUrl, NoAuth> {
    fn default() -> Self {
        Self::new()
    }
}

// URL setting
impl<A> HubConnectionBuilder<NoUrl, A>
where
    A: AuthState,
{
    pub fn url(self, url: impl Into<String>) -> HubConnectionBuilder<HasUrl, A> {
        HubConnectionBuilder {
            _state: TypeState::new(),
            url: Some(url.into()),
            auth: self.auth,
            reconnect_strategy: self.reconnect_strategy,
            event_type: self.event_type,
            shutdown_flag: self.shutdown_flag,
        }
    }
}

// Credential setting
impl<U> HubConnectionBuilder<U, NoAuth>
where
    U: UrlState,
{
    pub fn auth(self, auth: impl AuthProvider + 'static) -> HubConnectionBuilder<U, HasAuth> {
        HubConnectionBuilder {
            _state: TypeState::new(),
            url: self.url,
            auth: Some(Arc::new(auth)),
            reconnect_strategy: self.reconnect_strategy,
            event_type: self.event_type,
            shutdown_flag: self.shutdown_flag,
        }
    }

    /// Shorthand for `.auth(TokenAuth::new(token))`
    pub fn token(self, token: impl Into<String>) -> HubConnectionBuilder<U, HasAuth> {
        self.auth(TokenAuth::new(token))
    }
}

// Optional configuration methods
impl<U, A> HubConnectionBuilder<U, A>
where
    U: UrlState,
    A: AuthState,
{
    pub fn reconnect_strategy(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.reconnect_strategy = Some(Box::new(strategy));
        self
    }

    /// Fixed delay between reconnect attempts, retried forever
    pub fn reconnect_delay(self, delay: Duration) -> Self {
        self.reconnect_strategy(FixedDelay::forever(delay))
    }

    /// Event category to subscribe to on every socket (default `state_changed`)
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    /// Set a custom shutdown flag for coordinated shutdown across components
    ///
    /// When the flag is set to `false`, the connection closes its socket, fails
    /// pending calls and does not reconnect.
    ///
    /// # Example
    /// ```ignore
    /// let shutdown_flag = Arc::new(AtomicBool::new(true));
    ///
    /// let connection = hubsockets::builder()
    ///     .url("ws://homeassistant.local:8123/api/websocket")
    ///     .token(token)
    ///     .shutdown_flag(Arc::clone(&shutdown_flag))
    ///     .build()
    ///     .await?;
    ///
    /// // Later, from anywhere:
    /// shutdown_flag.store(false, Ordering::Release);
    /// ```
    pub fn shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }
}

// Build method - only available when all required fields are set
impl HubConnectionBuilder<HasUrl, HasAuth> {
    /// Assemble the configuration without starting anything
    pub fn into_config(self) -> Result<ConnectionConfig> {
        let url = self
            .url
            .ok_or_else(|| HubError::Configuration("URL must be set".into()))?;
        let auth = self
            .auth
            .ok_or_else(|| HubError::Configuration("credentials must be set".into()))?;

        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(HubError::Configuration(format!(
                "hub URL must use ws:// or wss://, got {}",
                url
            )));
        }
        if self.event_type.trim().is_empty() {
            return Err(HubError::Configuration("event type must not be empty".into()));
        }

        Ok(ConnectionConfig {
            url,
            auth,
            reconnect_strategy: self
                .reconnect_strategy
                .unwrap_or_else(|| Box::new(FixedDelay::default())),
            event_type: self.event_type,
            shutdown_flag: self
                .shutdown_flag
                .unwrap_or_else(|| Arc::new(AtomicBool::new(true))),
        })
    }

    /// Start the connection (returns immediately; see [`HubConnection::open`])
    pub async fn build(self) -> Result<HubConnection> {
        Ok(HubConnection::open(self.into_config()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HubConnectionBuilder::new()
            .url("ws://localhost:8123/api/websocket")
            .token("abc")
            .into_config()
            .unwrap();
        assert_eq!(config.url(), "ws://localhost:8123/api/websocket");
        assert_eq!(config.event_type(), "state_changed");
        assert_eq!(
            config.reconnect_strategy.next_delay(1_000),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_auth_can_come_before_url() {
        let config = HubConnectionBuilder::new()
            .token("abc")
            .url("wss://hub.example/api/websocket")
            .event_type("automation_triggered")
            .reconnect_delay(Duration::from_millis(250))
            .into_config()
            .unwrap();
        assert_eq!(config.event_type(), "automation_triggered");
        assert_eq!(
            config.reconnect_strategy.next_delay(0),
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_rejects_http_url() {
        let err = HubConnectionBuilder::new()
            .url("http://localhost:8123")
            .token("abc")
            .into_config()
            .unwrap_err();
        assert!(matches!(err, HubError::Configuration(_)));
    }

    #[test]
    fn test_rejects_empty_event_type() {
        let err = HubConnectionBuilder::new()
            .url("ws://localhost:8123/api/websocket")
            .token("abc")
            .event_type("  ")
            .into_config()
            .unwrap_err();
        assert!(matches!(err, HubError::Configuration(_)));
    }
}
