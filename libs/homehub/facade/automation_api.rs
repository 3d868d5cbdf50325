use crate::error::{FacadeError, Result};
use crate::facade::types::slugify;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Client for the hub's automation configuration REST API
///
/// Writes go to `{base_url}/api/config/automation/config/{id}`; both create
/// and delete are idempotent on the hub side.
pub struct AutomationClient {
    base_url: String,
    token: String,
    id_prefix: String,
    client: Client,
}

impl AutomationClient {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        id_prefix: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            id_prefix: id_prefix.into(),
            client: Client::new(),
        }
    }

    pub fn id_prefix(&self) -> &str {
        &self.id_prefix
    }

    /// Configuration id for the automation called `name`
    pub fn automation_id(&self, name: &str) -> Result<String> {
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(FacadeError::InvalidName(format!(
                "automation name {:?} has no usable characters",
                name
            )));
        }
        Ok(format!("{}{}", self.id_prefix, slug))
    }

    fn config_url(&self, id: &str) -> String {
        format!("{}/api/config/automation/config/{}", self.base_url, id)
    }

    /// Create or replace the automation stored under `id`
    pub async fn upsert(&self, id: &str, config: &Value) -> Result<()> {
        let url = self.config_url(id);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(config)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        info!(id, "Automation saved");
        Ok(())
    }

    /// Delete the automation stored under `id`
    ///
    /// Returns `false` if the hub did not know it.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let url = self.config_url(id);
        debug!("DELETE {}", url);

        let response = self.client.delete(&url).bearer_auth(&self.token).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            warn!(id, "Automation already absent");
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }

        info!(id, "Automation deleted");
        Ok(true)
    }
}

/// `HubRejected` carrying the hub's own error text when it sent one
async fn rejection(response: Response) -> FacadeError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|json| json.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);

    warn!(%status, "Configuration API rejected the request: {}", message);
    FacadeError::HubRejected(format!("{}: {}", status, message))
}
