//! Wire codec for the hub's JSON message envelope
//!
//! Outbound requests carry `{ "id": <u64>, "type": <string>, ... }`; the
//! authentication frame is the only outbound frame without an id. Inbound
//! frames are discriminated by their `type` field. Kinds this client does not
//! know decode to [`InboundFrame::Unknown`] so newer hub versions never break
//! the receive loop.

use crate::error::{HubError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event category that carries entity state transitions
pub const STATE_CHANGED: &str = "state_changed";

/// Frame sent to the hub
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    /// Answer to `auth_required`
    Auth { access_token: String },
    /// Correlated request; `payload` holds `type` and the type-specific fields
    Request { id: u64, payload: Map<String, Value> },
}

impl OutboundFrame {
    /// Frame a request payload under correlation id `id`
    ///
    /// The payload must be a JSON object. Any `id` the caller put in it is
    /// replaced: ids are owned by the connection.
    pub fn request(id: u64, payload: Value) -> Result<Self> {
        match payload {
            Value::Object(payload) => Ok(OutboundFrame::Request { id, payload }),
            other => Err(invalid_payload(&other)),
        }
    }

    pub fn auth(access_token: impl Into<String>) -> Self {
        OutboundFrame::Auth {
            access_token: access_token.into(),
        }
    }

    /// Correlation id, if this frame has one
    pub fn id(&self) -> Option<u64> {
        match self {
            OutboundFrame::Auth { .. } => None,
            OutboundFrame::Request { id, .. } => Some(*id),
        }
    }

    /// Serialize to the text sent over the socket
    pub fn encode(&self) -> Result<String> {
        let mut envelope = Map::new();
        match self {
            OutboundFrame::Auth { access_token } => {
                envelope.insert("type".into(), Value::from("auth"));
                envelope.insert("access_token".into(), Value::from(access_token.as_str()));
            }
            OutboundFrame::Request { id, payload } => {
                envelope.insert("id".into(), Value::from(*id));
                for (key, value) in payload {
                    if key != "id" {
                        envelope.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        serde_json::to_string(&Value::Object(envelope))
            .map_err(|e| HubError::Protocol(format!("Failed to encode frame: {}", e)))
    }
}

/// Payload of the event-subscription request for one event category
pub fn subscribe_events_payload(event_type: &str) -> Value {
    serde_json::json!({
        "type": "subscribe_events",
        "event_type": event_type,
    })
}

/// Frame received from the hub
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundFrame {
    AuthRequired {
        #[serde(default)]
        ha_version: Option<String>,
    },
    AuthOk {
        #[serde(default)]
        ha_version: Option<String>,
    },
    AuthInvalid {
        #[serde(default)]
        message: Option<String>,
    },
    Result(ResultFrame),
    Event(EventFrame),
    Pong {
        id: u64,
    },
    #[serde(other)]
    Unknown,
}

/// Decode one text frame
pub fn decode(text: &str) -> Result<InboundFrame> {
    serde_json::from_str(text).map_err(|e| HubError::Protocol(format!("{}: {}", e, truncate(text))))
}

/// Response to a correlated request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultFrame {
    pub id: u64,
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default)]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

fn default_success() -> bool {
    true
}

impl ResultFrame {
    /// Result frame synthesized for a `pong`
    pub fn pong(id: u64) -> Self {
        Self {
            id,
            success: true,
            result: Value::Null,
            error: None,
        }
    }

    /// Split into the success payload or the hub's error body
    pub fn into_result(self) -> std::result::Result<Value, ErrorBody> {
        if self.success {
            Ok(self.result)
        } else {
            Err(self.error.unwrap_or_else(|| ErrorBody {
                code: "unknown_error".into(),
                message: "hub reported failure without details".into(),
            }))
        }
    }
}

/// Error details of an unsuccessful result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Push event as delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFrame {
    /// Id of the subscription request that produced this event
    #[serde(default)]
    pub id: Option<u64>,
    pub event: HubEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubEvent {
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub time_fired: Option<DateTime<Utc>>,
    #[serde(default)]
    pub context: Option<Value>,
}

impl HubEvent {
    /// Decode the data of a `state_changed` event
    ///
    /// Returns `Ok(None)` for any other category.
    pub fn state_change(&self) -> Result<Option<StateChange>> {
        if self.event_type != STATE_CHANGED {
            return Ok(None);
        }
        serde_json::from_value(self.data.clone())
            .map(Some)
            .map_err(|e| HubError::Protocol(format!("Invalid state_changed data: {}", e)))
    }
}

/// Entity transition carried by a `state_changed` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub entity_id: String,
    #[serde(default)]
    pub old_state: Option<EntityState>,
    #[serde(default)]
    pub new_state: Option<EntityState>,
}

/// State object of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub last_changed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub context: Option<Value>,
}

impl EntityState {
    /// Human name of the entity, falling back to its id
    pub fn friendly_name(&self) -> &str {
        self.attributes
            .get("friendly_name")
            .and_then(Value::as_str)
            .unwrap_or(&self.entity_id)
    }

    /// Entity domain (`light` for `light.kitchen`)
    pub fn domain(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map(|(domain, _)| domain)
            .unwrap_or(&self.entity_id)
    }
}

/// Reject request payloads that cannot carry an envelope
pub(crate) fn ensure_object(payload: &Value) -> Result<()> {
    if payload.is_object() {
        return Ok(());
    }
    Err(invalid_payload(payload))
}

fn invalid_payload(payload: &Value) -> HubError {
    HubError::InvalidPayload(format!(
        "request payload must be a JSON object, got {}",
        json_kind(payload)
    ))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn truncate(text: &str) -> String {
    const MAX: usize = 200;
    if text.len() <= MAX {
        return text.to_string();
    }
    let mut end = MAX;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
