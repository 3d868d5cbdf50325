use crate::facade::{EntityTarget, SceneTarget, ScheduledAutomation, ServiceCall};
use chrono::NaiveTime;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// What the orchestrator asked for
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// One or more service calls, run concurrently
    CallServices(Vec<ServiceCall>),
    CreateScene {
        scene_id: String,
        entities: BTreeMap<String, SceneTarget>,
    },
    SnapshotScene {
        scene_id: String,
        entity_ids: Vec<String>,
    },
    ActivateScene {
        scene_id: String,
    },
    CreateAutomation(ScheduledAutomation),
    DeleteAutomation {
        name: String,
    },
    ListAutomations,
    /// A plain answer; nothing to execute
    None,
}

impl Action {
    /// Whether executing this needs control permission
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Action::ListAutomations | Action::None)
    }
}

/// Decoded orchestrator reply
#[derive(Debug, Clone, PartialEq)]
pub enum ActionPlan {
    /// The reply carried no usable JSON; it is the answer itself
    Text(String),
    Act {
        action: Action,
        message: Option<String>,
    },
}

/// Loose shape of every JSON reply the orchestrator may produce
#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    actions: Option<Vec<ServiceCall>>,
    #[serde(default)]
    message: Option<String>,

    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    entity_id: Option<EntityTarget>,
    #[serde(default)]
    extra: Option<Map<String, Value>>,

    #[serde(default)]
    scene_id: Option<String>,
    #[serde(default)]
    entities: Option<BTreeMap<String, SceneTarget>>,
    #[serde(default)]
    entity_ids: Option<Vec<String>>,

    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    at: Option<String>,
}

impl ActionPlan {
    /// Decode a free-text reply that may embed one JSON object
    ///
    /// The span from the first `{` to the last `}` is decoded. Anything that
    /// fails to decode, or lacks the fields its action needs, falls back to
    /// the raw text, unchanged.
    pub fn from_reply(raw: &str) -> Self {
        let text = || ActionPlan::Text(raw.to_string());

        let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
            return text();
        };
        if end < start {
            return text();
        }

        let plan: RawPlan = match serde_json::from_str(&raw[start..=end]) {
            Ok(plan) => plan,
            Err(e) => {
                debug!("Reply JSON did not decode as a plan: {}", e);
                return text();
            }
        };

        match plan.into_action() {
            Some((action, message)) => ActionPlan::Act { action, message },
            None => text(),
        }
    }
}

impl RawPlan {
    fn into_action(self) -> Option<(Action, Option<String>)> {
        let action = match (self.action.as_deref(), self.actions.is_some()) {
            (Some("create_automation"), _) => Action::CreateAutomation(ScheduledAutomation {
                at: parse_time(self.at.as_deref()?)?,
                actions: self.steps()?,
                name: self.name?,
            }),
            // A list of calls wins over any single-action fields
            (_, true) => Action::CallServices(self.actions?),
            (Some("call_service"), false) => Action::CallServices(vec![self.inline_call()?]),
            (Some("create_scene"), false) => Action::CreateScene {
                scene_id: self.scene_id?,
                entities: self.entities?,
            },
            (Some("snapshot_scene"), false) => Action::SnapshotScene {
                scene_id: self.scene_id?,
                entity_ids: self.entity_ids?,
            },
            (Some("activate_scene"), false) => Action::ActivateScene {
                scene_id: self.scene_id?,
            },
            (Some("delete_automation"), false) => Action::DeleteAutomation { name: self.name? },
            (Some("list_automations"), false) => Action::ListAutomations,
            // `none` and anything unrecognised: just answer
            _ => Action::None,
        };

        Some((action, self.message))
    }

    /// The single call spelled out at the top level of the reply
    fn inline_call(&self) -> Option<ServiceCall> {
        Some(ServiceCall {
            domain: self.domain.clone()?,
            service: self.service.clone()?,
            target: self.entity_id.clone(),
            extra: self.extra.clone().unwrap_or_default(),
        })
    }

    /// Automation steps: the `actions` list, or one inline call
    fn steps(&self) -> Option<Vec<ServiceCall>> {
        match &self.actions {
            Some(actions) if !actions.is_empty() => Some(actions.clone()),
            Some(_) => None,
            None => self.inline_call().map(|call| vec![call]),
        }
    }
}

/// `HH:MM` or `HH:MM:SS`
fn parse_time(at: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(at, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(at, "%H:%M"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_call_with_extra() {
        let reply = r#"Sure! {"action": "call_service", "domain": "light", "service": "turn_on",
            "entity_id": "light.rgb_lamp", "extra": {"rgb_color": [255, 0, 0], "brightness_pct": 80},
            "message": "Lamp set to red at 80%."}"#;

        let expected = ServiceCall::new("light", "turn_on")
            .target("light.rgb_lamp")
            .with("rgb_color", json!([255, 0, 0]))
            .with("brightness_pct", json!(80));
        assert_eq!(
            ActionPlan::from_reply(reply),
            ActionPlan::Act {
                action: Action::CallServices(vec![expected]),
                message: Some("Lamp set to red at 80%.".into()),
            }
        );
    }

    #[test]
    fn test_action_list() {
        let reply = r#"{"actions": [
            {"domain": "light", "service": "turn_off", "entity_id": "light.living_room"},
            {"domain": "switch", "service": "turn_off", "entity_id": "switch.tv"}
        ], "message": "Good night!"}"#;

        match ActionPlan::from_reply(reply) {
            ActionPlan::Act {
                action: Action::CallServices(calls),
                message,
            } => {
                assert_eq!(calls.len(), 2);
                assert_eq!(calls[1].target, Some(EntityTarget::from("switch.tv")));
                assert_eq!(message.as_deref(), Some("Good night!"));
            }
            other => panic!("unexpected plan: {:?}", other),
        }
    }

    #[test]
    fn test_plain_text_and_broken_json() {
        assert_eq!(
            ActionPlan::from_reply("  The kitchen light is on.\n"),
            ActionPlan::Text("  The kitchen light is on.\n".into())
        );
        assert_eq!(
            ActionPlan::from_reply("} backwards {"),
            ActionPlan::Text("} backwards {".into())
        );
        assert_eq!(
            ActionPlan::from_reply(r#"{"action": "call_service", "domain": "light"}"#),
            ActionPlan::Text(r#"{"action": "call_service", "domain": "light"}"#.into())
        );
        assert_eq!(
            ActionPlan::from_reply("{not json}"),
            ActionPlan::Text("{not json}".into())
        );
    }

    #[test]
    fn test_none_and_unknown_actions_just_answer() {
        for reply in [
            r#"{"action": "none", "message": "It is 21 degrees."}"#,
            r#"{"action": "dance", "message": "It is 21 degrees."}"#,
        ] {
            assert_eq!(
                ActionPlan::from_reply(reply),
                ActionPlan::Act {
                    action: Action::None,
                    message: Some("It is 21 degrees.".into()),
                }
            );
        }
    }

    #[test]
    fn test_scene_shapes() {
        let create = ActionPlan::from_reply(
            r#"{"action": "create_scene", "scene_id": "movie",
                "entities": {"light.tv": {"state": "on", "brightness": 40}}}"#,
        );
        let mut entities = BTreeMap::new();
        entities.insert(
            "light.tv".to_string(),
            SceneTarget::new("on").with("brightness", json!(40)),
        );
        assert_eq!(
            create,
            ActionPlan::Act {
                action: Action::CreateScene {
                    scene_id: "movie".into(),
                    entities,
                },
                message: None,
            }
        );

        let snapshot = ActionPlan::from_reply(
            r#"{"action": "snapshot_scene", "scene_id": "before", "entity_ids": ["light.a"]}"#,
        );
        assert!(matches!(
            snapshot,
            ActionPlan::Act { action: Action::SnapshotScene { ref entity_ids, .. }, .. }
                if entity_ids == &vec!["light.a".to_string()]
        ));

        let activate = ActionPlan::from_reply(r#"{"action": "activate_scene", "scene_id": "movie"}"#);
        assert!(matches!(
            activate,
            ActionPlan::Act { action: Action::ActivateScene { .. }, .. }
        ));
    }

    #[test]
    fn test_automation_shapes() {
        let create = ActionPlan::from_reply(
            r#"{"action": "create_automation", "name": "Morning lights", "at": "07:30",
                "actions": [{"domain": "light", "service": "turn_on", "entity_id": "light.bedroom"}],
                "message": "Scheduled."}"#,
        );
        match create {
            ActionPlan::Act {
                action: Action::CreateAutomation(automation),
                ..
            } => {
                assert_eq!(automation.name, "Morning lights");
                assert_eq!(automation.at, NaiveTime::from_hms_opt(7, 30, 0).unwrap());
                assert_eq!(automation.actions.len(), 1);
            }
            other => panic!("unexpected plan: {:?}", other),
        }

        let bad_time = ActionPlan::from_reply(
            r#"{"action": "create_automation", "name": "x", "at": "soon",
                "domain": "light", "service": "turn_on"}"#,
        );
        assert!(matches!(bad_time, ActionPlan::Text(_)));

        let delete = ActionPlan::from_reply(r#"{"action": "delete_automation", "name": "Morning lights"}"#);
        assert!(delete_is(&delete, "Morning lights"));

        let list = ActionPlan::from_reply(r#"{"action": "list_automations"}"#);
        assert_eq!(
            list,
            ActionPlan::Act {
                action: Action::ListAutomations,
                message: None
            }
        );
    }

    fn delete_is(plan: &ActionPlan, expected: &str) -> bool {
        matches!(plan, ActionPlan::Act { action: Action::DeleteAutomation { name }, .. } if name == expected)
    }

    #[test]
    fn test_mutating() {
        assert!(Action::CallServices(vec![]).is_mutating());
        assert!(Action::ActivateScene { scene_id: "x".into() }.is_mutating());
        assert!(!Action::ListAutomations.is_mutating());
        assert!(!Action::None.is_mutating());
    }
}
