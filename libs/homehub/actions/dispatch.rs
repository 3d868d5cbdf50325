use crate::actions::plan::{Action, ActionPlan};
use crate::error::Result;
use crate::facade::HubCommands;
use futures::future::try_join_all;
use hubsockets::HubRequester;
use std::collections::HashSet;
use tracing::{error, info, warn};

pub const DONE_REPLY: &str = "Done.";
pub const APOLOGY_REPLY: &str = "Something went wrong, please try again.";
pub const DENIED_REPLY: &str = "You are not allowed to control devices.";
pub const UNAUTHORIZED_REPLY: &str = "You are not authorized to use this bot.";

/// Two tiers: who may talk to the bridge at all, and who may control devices
pub trait PermissionCheck: Send + Sync {
    fn may_use(&self, _identity: &str) -> bool {
        true
    }

    fn may_control(&self, identity: &str) -> bool;
}

impl<F> PermissionCheck for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn may_control(&self, identity: &str) -> bool {
        self(identity)
    }
}

/// Fixed registered users and admins; anyone else is turned away
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    users: HashSet<String>,
    admins: HashSet<String>,
}

impl AllowList {
    pub fn new(
        users: impl IntoIterator<Item = impl Into<String>>,
        admins: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            users: users.into_iter().map(Into::into).collect(),
            admins: admins.into_iter().map(Into::into).collect(),
        }
    }
}

impl PermissionCheck for AllowList {
    fn may_use(&self, identity: &str) -> bool {
        self.users.contains(identity) || self.admins.contains(identity)
    }

    fn may_control(&self, identity: &str) -> bool {
        self.admins.contains(identity)
    }
}

/// Executes action plans on behalf of a front-end user
///
/// Always answers with plain text: failures are logged and turned into an
/// apology.
pub struct Dispatcher<R, P> {
    commands: HubCommands<R>,
    permissions: P,
}

impl<R, P> Dispatcher<R, P>
where
    R: HubRequester,
    P: PermissionCheck,
{
    pub fn new(commands: HubCommands<R>, permissions: P) -> Self {
        Self {
            commands,
            permissions,
        }
    }

    pub fn commands(&self) -> &HubCommands<R> {
        &self.commands
    }

    /// Decode an orchestrator reply and handle it
    pub async fn handle_reply(&self, identity: &str, raw: &str) -> String {
        self.handle(identity, ActionPlan::from_reply(raw)).await
    }

    pub async fn handle(&self, identity: &str, plan: ActionPlan) -> String {
        if !self.permissions.may_use(identity) {
            warn!(identity, "Unregistered identity");
            return UNAUTHORIZED_REPLY.to_string();
        }

        let (action, message) = match plan {
            ActionPlan::Text(text) => return text,
            ActionPlan::Act { action, message } => (action, message),
        };

        if action.is_mutating() && !self.permissions.may_control(identity) {
            warn!(identity, "Control action denied");
            return DENIED_REPLY.to_string();
        }

        match self.execute(action).await {
            Ok(Some(listing)) => match message {
                Some(message) => format!("{}\n{}", message, listing),
                None => listing,
            },
            Ok(None) => message.unwrap_or_else(|| DONE_REPLY.to_string()),
            Err(e) => {
                error!(identity, "Failed to execute action: {}", e);
                APOLOGY_REPLY.to_string()
            }
        }
    }

    /// Run one action; `Some` carries a text answer produced by the action
    async fn execute(&self, action: Action) -> Result<Option<String>> {
        match action {
            Action::CallServices(calls) => {
                info!(count = calls.len(), "Executing service calls");
                try_join_all(calls.iter().map(|call| self.commands.call_service(call))).await?;
            }
            Action::CreateScene { scene_id, entities } => {
                self.commands.create_scene(&scene_id, &entities).await?;
            }
            Action::SnapshotScene {
                scene_id,
                entity_ids,
            } => {
                self.commands.snapshot_scene(&scene_id, &entity_ids).await?;
            }
            Action::ActivateScene { scene_id } => {
                self.commands.activate_scene(&scene_id).await?;
            }
            Action::CreateAutomation(automation) => {
                let id = self.commands.create_automation(&automation).await?;
                info!(id = %id, "Automation created");
            }
            Action::DeleteAutomation { name } => {
                self.commands.delete_automation(&name).await?;
            }
            Action::ListAutomations => {
                let automations = self.commands.list_automations().await?;
                if automations.is_empty() {
                    return Ok(Some("No automations.".to_string()));
                }
                let lines: Vec<String> = automations
                    .iter()
                    .map(|a| format!("{} ({})", a.name, a.state))
                    .collect();
                return Ok(Some(lines.join("\n")));
            }
            Action::None => {}
        }
        Ok(None)
    }
}
