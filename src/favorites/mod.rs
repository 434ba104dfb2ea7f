//! User-configured favorites.
//!
//! Custom favorites live in the panel configuration rather than on the
//! backend. Each one either carries explicit command/device ids, sent like a
//! backend favorite, or a dashboard action that is resolved here into a
//! service call or handed back to the host.

use crate::entity::coerce_id;
use crate::service::ServiceCall;
use serde::Serialize;
use serde_json::{Map, Value};

/// Normalized custom favorite
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CustomFavorite {
    /// Position in the configured list
    pub index: usize,
    pub name: String,
    pub icon: Option<String>,
    pub action: Option<CardAction>,
    pub command_id: Option<i64>,
    pub device_id: Option<i64>,
}

impl CustomFavorite {
    /// Normalize one configured entry.
    ///
    /// Entries without a name, or with neither usable ids nor a recognizable
    /// action, are dropped.
    pub fn from_value(value: &Value, index: usize) -> Option<Self> {
        let obj = value.as_object()?;
        let name = first_present(obj, &["name", "label"])
            .map(text)
            .unwrap_or_default();
        if name.is_empty() {
            return None;
        }
        let icon = obj.get("icon").map(text).filter(|s| !s.is_empty());

        let raw_command = first_present(obj, &["command_id", "key_id", "command", "key", "id"]);
        let raw_device = first_present(obj, &["device_id", "activity_id", "device", "activity"]);
        let command_id = raw_command.and_then(coerce_id);
        let device_id = raw_device.and_then(coerce_id);
        // A device that is present must be usable; an absent one falls back later
        let has_ids = command_id.is_some() && (raw_device.is_none() || device_id.is_some());

        let action = ["action", "tap_action"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_object))
            .map(|map| CardAction(map.clone()))
            .filter(CardAction::is_recognized);

        if !has_ids && action.is_none() {
            return None;
        }

        Some(Self {
            index,
            name,
            icon,
            action,
            command_id,
            device_id,
        })
    }
}

/// Normalize the `custom_favorites` config list, keeping original indices
pub fn normalize_custom_favorites(items: &[Value]) -> Vec<CustomFavorite> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| CustomFavorite::from_value(item, index))
        .collect()
}

/// Dashboard action attached to a custom favorite
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CardAction(pub Map<String, Value>);

/// Action the host has to carry out itself
#[derive(Clone, Debug, PartialEq)]
pub enum HostAction {
    MoreInfo { entity_id: String },
    Navigate { path: String },
    Url { url: String },
    /// Passed through untouched
    FireDomEvent(Value),
}

/// What running a [`CardAction`] amounts to
#[derive(Clone, Debug, PartialEq)]
pub enum ActionOutcome {
    Service(ServiceCall),
    Host(HostAction),
    Nothing,
}

impl CardAction {
    const MARKERS: [&'static str; 5] = [
        "action",
        "service",
        "perform_action",
        "navigation_path",
        "url_path",
    ];

    pub fn is_recognized(&self) -> bool {
        Self::MARKERS.iter().any(|key| self.field(key).is_some())
    }

    fn field(&self, key: &str) -> Option<String> {
        self.0.get(key).map(text).filter(|s| !s.is_empty())
    }

    fn entity_id(&self) -> Option<String> {
        self.field("entity_id").or_else(|| self.field("entity"))
    }

    pub fn resolve(&self) -> ActionOutcome {
        let action = self.field("action").unwrap_or_default().to_lowercase();
        let service = self.field("service").or_else(|| self.field("perform_action"));
        let implicit_service =
            (action.is_empty() || action == "default") && service.is_some();

        match action.as_str() {
            "none" => ActionOutcome::Nothing,
            "call-service" | "perform-action" => self.service_call(service),
            _ if implicit_service => self.service_call(service),
            "toggle" => match self.entity_id() {
                Some(entity_id) => ActionOutcome::Service(ServiceCall::new(
                    "homeassistant",
                    "toggle",
                    serde_json::json!({ "entity_id": entity_id }),
                )),
                None => ActionOutcome::Nothing,
            },
            "more-info" => self
                .entity_id()
                .map(|entity_id| ActionOutcome::Host(HostAction::MoreInfo { entity_id }))
                .unwrap_or(ActionOutcome::Nothing),
            "navigate" => self
                .field("navigation_path")
                .map(|path| ActionOutcome::Host(HostAction::Navigate { path }))
                .unwrap_or(ActionOutcome::Nothing),
            "url" => self
                .field("url_path")
                .map(|url| ActionOutcome::Host(HostAction::Url { url }))
                .unwrap_or(ActionOutcome::Nothing),
            "fire-dom-event" => {
                ActionOutcome::Host(HostAction::FireDomEvent(Value::Object(self.0.clone())))
            }
            _ => ActionOutcome::Nothing,
        }
    }

    fn service_call(&self, service: Option<String>) -> ActionOutcome {
        let Some((domain, name)) = service.as_deref().and_then(|s| s.split_once('.')) else {
            return ActionOutcome::Nothing;
        };

        let mut data = ["service_data", "data"]
            .iter()
            .find_map(|key| self.0.get(*key).and_then(Value::as_object))
            .cloned()
            .unwrap_or_default();
        if let Some(target) = self.0.get("target").filter(|t| t.is_object()) {
            data.insert("target".to_string(), target.clone());
        }

        ActionOutcome::Service(ServiceCall::new(domain, name, Value::Object(data)))
    }
}

/// First key whose value is present and not null
fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| obj.get(*key).filter(|v| !v.is_null()))
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}
