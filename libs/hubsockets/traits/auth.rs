use crate::error::Result;
use async_trait::async_trait;

/// Trait for providing hub credentials
///
/// The connection asks for the access token every time the hub sends an
/// `auth_required` frame, so a provider may rotate tokens between sockets.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Get the access token to answer the hub's authentication challenge
    ///
    /// # Returns
    /// * `Ok(token)` - Send this token in the `auth` frame
    /// * `Err(HubError)` - Credentials unavailable; the socket is dropped and
    ///   the reconnect policy applies
    async fn access_token(&self) -> Result<String>;
}

/// Static long-lived access token
#[derive(Clone)]
pub struct TokenAuth {
    token: String,
}

impl TokenAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

// Never print the token itself.
impl std::fmt::Debug for TokenAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuth")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl AuthProvider for TokenAuth {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}
