use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Entity (or entities) a service call acts on
///
/// The hub accepts a single id, `all`, or a list of ids wherever it takes
/// `entity_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityTarget {
    One(String),
    Many(Vec<String>),
}

impl EntityTarget {
    pub fn to_value(&self) -> Value {
        match self {
            EntityTarget::One(id) => Value::String(id.clone()),
            EntityTarget::Many(ids) => json!(ids),
        }
    }
}

impl From<&str> for EntityTarget {
    fn from(id: &str) -> Self {
        EntityTarget::One(id.to_string())
    }
}

impl From<String> for EntityTarget {
    fn from(id: String) -> Self {
        EntityTarget::One(id)
    }
}

impl From<Vec<String>> for EntityTarget {
    fn from(ids: Vec<String>) -> Self {
        EntityTarget::Many(ids)
    }
}

/// One device action: `domain.service` on an optional target
///
/// Deserializes straight from action-plan items
/// (`{ domain, service, entity_id?, extra? }`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCall {
    pub domain: String,
    pub service: String,
    #[serde(default, rename = "entity_id", skip_serializing_if = "Option::is_none")]
    pub target: Option<EntityTarget>,
    /// Additional service data (`brightness_pct`, `rgb_color`, ...)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl ServiceCall {
    pub fn new(domain: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            target: None,
            extra: Map::new(),
        }
    }

    pub fn target(mut self, target: impl Into<EntityTarget>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// `service_data`: the target's `entity_id` followed by the extra
    /// attributes, which win on a clash
    pub fn service_data(&self) -> Map<String, Value> {
        let mut data = Map::new();
        if let Some(target) = &self.target {
            data.insert("entity_id".into(), target.to_value());
        }
        for (key, value) in &self.extra {
            data.insert(key.clone(), value.clone());
        }
        data
    }

    pub fn to_payload(&self) -> Value {
        json!({
            "type": "call_service",
            "domain": self.domain,
            "service": self.service,
            "service_data": self.service_data(),
        })
    }

    /// The same call as an automation action
    pub fn to_automation_action(&self) -> Value {
        let mut action = Map::new();
        action.insert(
            "service".into(),
            Value::String(format!("{}.{}", self.domain, self.service)),
        );
        if let Some(target) = &self.target {
            action.insert("target".into(), json!({ "entity_id": target.to_value() }));
        }
        if !self.extra.is_empty() {
            action.insert("data".into(), Value::Object(self.extra.clone()));
        }
        Value::Object(action)
    }
}

/// Desired state of one entity inside a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneTarget {
    pub state: String,
    /// Attributes applied alongside the state (`brightness`, `color_temp`, ...)
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl SceneTarget {
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            attributes: Map::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Automation that runs a list of service calls once a day at `at`
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledAutomation {
    pub name: String,
    pub at: NaiveTime,
    pub actions: Vec<ServiceCall>,
}

impl ScheduledAutomation {
    /// Body for the automation configuration API
    pub fn config(&self, id: &str) -> Value {
        json!({
            "id": id,
            "alias": self.name,
            "description": "Managed by hass-bridge",
            "trigger": [{ "platform": "time", "at": self.at.format("%H:%M:%S").to_string() }],
            "condition": [],
            "action": self.actions.iter().map(ServiceCall::to_automation_action).collect::<Vec<_>>(),
            "mode": "single",
        })
    }
}

/// Automation owned by the bridge, as listed from the hub's states
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationSummary {
    pub entity_id: String,
    /// Configuration id (carries the reserved prefix)
    pub id: String,
    pub name: String,
    /// `on` when enabled
    pub state: String,
}

/// Lowercase ASCII slug: runs of anything else collapse into one `_`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}
