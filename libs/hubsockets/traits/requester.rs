use crate::core::codec::ResultFrame;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// The request/response primitive of a hub session
///
/// Everything that talks to the hub through commands (as opposed to push
/// events) goes through this trait, so it can run against a live
/// [`HubConnection`](crate::HubConnection) or a scripted stand-in.
#[async_trait]
pub trait HubRequester: Send + Sync {
    /// Send `payload` as one request and wait for the hub's result frame
    ///
    /// `payload` must be a JSON object without an `id`; the correlation id is
    /// assigned by the implementation.
    async fn request(&self, payload: Value) -> Result<ResultFrame>;
}

#[async_trait]
impl<T: HubRequester + ?Sized> HubRequester for std::sync::Arc<T> {
    async fn request(&self, payload: Value) -> Result<ResultFrame> {
        (**self).request(payload).await
    }
}
