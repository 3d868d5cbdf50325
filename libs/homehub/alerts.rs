//! Push notifications derived from state changes
//!
//! Each rule watches one entity and produces a text message when its new
//! state matches. Messages go to a sink supplied by the front-end.

use hubsockets::{EventFrame, EventSubscriber, StateChange};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One notification rule
///
/// Exactly one of `state`, `below` or `above` must be set. `message` may use
/// `{state}` and `{name}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub entity_id: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub below: Option<f64>,
    #[serde(default)]
    pub above: Option<f64>,
    pub message: String,
}

impl AlertRule {
    pub fn validate(&self) -> Result<(), String> {
        let conditions = [self.state.is_some(), self.below.is_some(), self.above.is_some()]
            .iter()
            .filter(|set| **set)
            .count();

        if conditions != 1 {
            return Err(format!(
                "alert for {} needs exactly one of state, below, above",
                self.entity_id
            ));
        }
        if self.message.trim().is_empty() {
            return Err(format!("alert for {} has an empty message", self.entity_id));
        }
        Ok(())
    }

    /// The notification text if `change` triggers this rule
    pub fn evaluate(&self, change: &StateChange) -> Option<String> {
        if change.entity_id != self.entity_id {
            return None;
        }
        let new_state = change.new_state.as_ref()?;

        let triggered = if let Some(expected) = &self.state {
            new_state.state == *expected
        } else {
            // Non-numeric states (unavailable, unknown) never trigger thresholds
            let value: f64 = new_state.state.parse().ok()?;
            self.below.map_or(false, |limit| value < limit)
                || self.above.map_or(false, |limit| value > limit)
        };

        triggered.then(|| {
            self.message
                .replace("{state}", &new_state.state)
                .replace("{name}", new_state.friendly_name())
        })
    }
}

/// Event subscriber that turns matching state changes into messages
pub struct AlertNotifier<F> {
    rules: Vec<AlertRule>,
    sink: F,
}

impl<F> AlertNotifier<F>
where
    F: FnMut(String) + Send + 'static,
{
    pub fn new(rules: Vec<AlertRule>, sink: F) -> Self {
        Self { rules, sink }
    }
}

impl<F> EventSubscriber for AlertNotifier<F>
where
    F: FnMut(String) + Send + 'static,
{
    fn handle(&mut self, frame: &EventFrame) -> hubsockets::Result<()> {
        let Some(change) = frame.event.state_change()? else {
            return Ok(());
        };

        for rule in &self.rules {
            if let Some(message) = rule.evaluate(&change) {
                debug!(entity_id = %change.entity_id, "Alert triggered");
                (self.sink)(message);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn frame(entity_id: &str, state: &str) -> EventFrame {
        serde_json::from_value(json!({
            "id": 1,
            "event": {
                "event_type": "state_changed",
                "data": {
                    "entity_id": entity_id,
                    "old_state": null,
                    "new_state": {
                        "entity_id": entity_id,
                        "state": state,
                        "attributes": {"friendly_name": "Living Room"}
                    }
                }
            }
        }))
        .unwrap()
    }

    fn motion_rule() -> AlertRule {
        AlertRule {
            entity_id: "binary_sensor.front_door_motion".into(),
            state: Some("on".into()),
            below: None,
            above: None,
            message: "Motion detected at the front door!".into(),
        }
    }

    fn cold_rule() -> AlertRule {
        AlertRule {
            entity_id: "sensor.living_room_temperature".into(),
            state: None,
            below: Some(15.0),
            above: None,
            message: "Low temperature: {state} in {name}".into(),
        }
    }

    #[test]
    fn test_state_match() {
        let rule = motion_rule();
        let on = frame("binary_sensor.front_door_motion", "on");
        let off = frame("binary_sensor.front_door_motion", "off");

        let change = on.event.state_change().unwrap().unwrap();
        assert_eq!(
            rule.evaluate(&change).as_deref(),
            Some("Motion detected at the front door!")
        );
        let change = off.event.state_change().unwrap().unwrap();
        assert_eq!(rule.evaluate(&change), None);
    }

    #[test]
    fn test_threshold_and_placeholders() {
        let rule = cold_rule();
        let cold = frame("sensor.living_room_temperature", "12.5");
        let warm = frame("sensor.living_room_temperature", "21");
        let unknown = frame("sensor.living_room_temperature", "unavailable");

        let change = cold.event.state_change().unwrap().unwrap();
        assert_eq!(
            rule.evaluate(&change).as_deref(),
            Some("Low temperature: 12.5 in Living Room")
        );
        for frame in [warm, unknown] {
            let change = frame.event.state_change().unwrap().unwrap();
            assert_eq!(rule.evaluate(&change), None);
        }
    }

    #[test]
    fn test_validate() {
        assert!(motion_rule().validate().is_ok());
        assert!(cold_rule().validate().is_ok());

        let mut both = cold_rule();
        both.state = Some("on".into());
        assert!(both.validate().is_err());

        let mut neither = cold_rule();
        neither.below = None;
        assert!(neither.validate().is_err());
    }

    #[test]
    fn test_notifier_sends_to_sink() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let mut notifier = {
            let sent = Arc::clone(&sent);
            AlertNotifier::new(vec![motion_rule(), cold_rule()], move |message| {
                sent.lock().unwrap().push(message)
            })
        };

        notifier.handle(&frame("binary_sensor.front_door_motion", "on")).unwrap();
        notifier.handle(&frame("light.kitchen", "on")).unwrap();
        notifier.handle(&frame("sensor.living_room_temperature", "9")).unwrap();

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0], "Motion detected at the front door!");
        assert!(sent[1].starts_with("Low temperature: 9"));
    }
}
