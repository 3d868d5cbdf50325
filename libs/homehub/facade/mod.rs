//! Typed hub commands
//!
//! Every operation is one `request` on the hub connection, except automation
//! create/delete which go through the REST configuration API. No retries
//! here; reconnecting is the connection's business.

pub mod automation_api;
pub mod types;

pub use automation_api::AutomationClient;
pub use types::{
    slugify, AutomationSummary, EntityTarget, SceneTarget, ScheduledAutomation, ServiceCall,
};

use crate::error::{FacadeError, Result};
use hubsockets::{EntityState, HubRequester};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Command facade over any [`HubRequester`]
pub struct HubCommands<R> {
    requester: R,
    automations: AutomationClient,
}

impl<R: HubRequester> HubCommands<R> {
    pub fn new(requester: R, automations: AutomationClient) -> Self {
        Self {
            requester,
            automations,
        }
    }

    pub fn requester(&self) -> &R {
        &self.requester
    }

    /// One request; `success: false` becomes `CommandFailed`
    async fn command(&self, payload: Value) -> Result<Value> {
        let frame = self.requester.request(payload).await?;
        frame
            .into_result()
            .map_err(|error| FacadeError::CommandFailed {
                code: error.code,
                message: error.message,
            })
    }

    /// Current states, optionally only entities whose id starts with `prefix`
    pub async fn get_states(&self, prefix: Option<&str>) -> Result<Vec<EntityState>> {
        let result = self.command(json!({ "type": "get_states" })).await?;
        let mut states: Vec<EntityState> = serde_json::from_value(result)?;

        if let Some(prefix) = prefix {
            states.retain(|state| state.entity_id.starts_with(prefix));
        }
        debug!(count = states.len(), ?prefix, "Fetched states");
        Ok(states)
    }

    pub async fn call_service(&self, call: &ServiceCall) -> Result<Value> {
        info!(
            domain = %call.domain,
            service = %call.service,
            entity = ?call.target,
            "Calling service"
        );
        self.command(call.to_payload()).await
    }

    /// Scene from explicit per-entity targets
    pub async fn create_scene(
        &self,
        scene_id: &str,
        targets: &BTreeMap<String, SceneTarget>,
    ) -> Result<Value> {
        let call = ServiceCall::new("scene", "create")
            .with("scene_id", json!(scene_id))
            .with("entities", serde_json::to_value(targets)?);
        self.call_service(&call).await
    }

    /// Scene capturing the current states of `entity_ids`
    pub async fn snapshot_scene(&self, scene_id: &str, entity_ids: &[String]) -> Result<Value> {
        let call = ServiceCall::new("scene", "create")
            .with("scene_id", json!(scene_id))
            .with("snapshot_entities", json!(entity_ids));
        self.call_service(&call).await
    }

    pub async fn activate_scene(&self, scene_id: &str) -> Result<Value> {
        let entity_id = if scene_id.starts_with("scene.") {
            scene_id.to_string()
        } else {
            format!("scene.{}", scene_id)
        };
        self.call_service(&ServiceCall::new("scene", "turn_on").target(entity_id))
            .await
    }

    /// Create (or replace) a daily automation; returns its configuration id
    pub async fn create_automation(&self, automation: &ScheduledAutomation) -> Result<String> {
        let id = self.automations.automation_id(&automation.name)?;
        self.automations.upsert(&id, &automation.config(&id)).await?;
        Ok(id)
    }

    /// Delete the automation created under `name`; absent is fine
    pub async fn delete_automation(&self, name: &str) -> Result<()> {
        let id = self.automations.automation_id(name)?;
        self.automations.delete(&id).await?;
        Ok(())
    }

    /// Automations whose configuration id carries the reserved prefix
    pub async fn list_automations(&self) -> Result<Vec<AutomationSummary>> {
        let prefix = self.automations.id_prefix();
        let states = self.get_states(Some("automation.")).await?;

        Ok(states
            .into_iter()
            .filter_map(|state| {
                let id = state.attributes.get("id")?.as_str()?;
                if !id.starts_with(prefix) {
                    return None;
                }
                Some(AutomationSummary {
                    id: id.to_string(),
                    name: state.friendly_name().to_string(),
                    entity_id: state.entity_id.clone(),
                    state: state.state.clone(),
                })
            })
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use hubsockets::{HubError, HubRequester, ResultFrame};
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Scripted requester: records payloads, answers from a queue
    ///
    /// An empty queue answers `success: true` with a null result.
    #[derive(Default)]
    pub struct Recorder {
        pub sent: Mutex<Vec<Value>>,
        replies: Mutex<VecDeque<Result<ResultFrame, HubError>>>,
        next_id: AtomicU64,
    }

    impl Recorder {
        pub fn reply(&self, result: Value) -> &Self {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            self.replies.lock().push_back(Ok(ResultFrame {
                id,
                success: true,
                result,
                error: None,
            }));
            self
        }

        pub fn fail(&self, code: &str, message: &str) -> &Self {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            self.replies.lock().push_back(Ok(ResultFrame {
                id,
                success: false,
                result: Value::Null,
                error: Some(hubsockets::ErrorBody {
                    code: code.into(),
                    message: message.into(),
                }),
            }));
            self
        }

        pub fn error(&self, error: HubError) -> &Self {
            self.replies.lock().push_back(Err(error));
            self
        }

        pub fn sent(&self) -> Vec<Value> {
            self.sent.lock().clone()
        }
    }

    #[async_trait]
    impl HubRequester for Recorder {
        async fn request(&self, payload: Value) -> hubsockets::Result<ResultFrame> {
            self.sent.lock().push(payload);
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(ResultFrame::pong(0)))
        }
    }
}
