use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};


/// Entity state string reported while the remote cannot be reached
pub const UNAVAILABLE: &str = "unavailable";

/// Remote entity state as pushed by the host.
///
/// Attributes are kept raw: the backend omits, clears and re-adds them
/// opportunistically, and "key present with an empty list" has to stay
/// distinguishable from "key missing".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteEntitySnapshot {
    pub entity_id: String,
    pub state: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// Per-activity list attributes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyedList {
    AssignedKeys,
    MacroKeys,
    FavoriteKeys,
}

impl KeyedList {
    pub const ALL: [KeyedList; 3] = [
        KeyedList::AssignedKeys,
        KeyedList::MacroKeys,
        KeyedList::FavoriteKeys,
    ];

    /// Attribute name on the remote entity
    pub fn attribute(&self) -> &'static str {
        match self {
            KeyedList::AssignedKeys => "assigned_keys",
            KeyedList::MacroKeys => "macro_keys",
            KeyedList::FavoriteKeys => "favorite_keys",
        }
    }
}

/// Backend-defined activity ("scene")
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Activity {
    pub id: i64,
    pub name: String,
    /// Per-activity power state label, may be blank
    pub state: String,
}

impl Activity {
    /// Parse one entry of the `activities` attribute.
    ///
    /// Entries without a finite id or a name are dropped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = coerce_id(value.get("id")?)?;
        let name = value.get("name").map(label).unwrap_or_default();
        if name.is_empty() {
            return None;
        }
        let state = value.get("state").map(label).unwrap_or_default();
        Some(Self { id, name, state })
    }
}

/// Macro or favorite reported by the backend
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DrawerItem {
    pub name: String,
    pub command_id: Option<i64>,
    pub device_id: Option<i64>,
    pub icon: Option<String>,
}

impl DrawerItem {
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let name = obj.get("name").map(label).unwrap_or_default();
        let command_id = obj
            .get("command_id")
            .filter(|v| !v.is_null())
            .or_else(|| obj.get("id"))
            .and_then(coerce_id);
        let device_id = obj
            .get("device_id")
            .filter(|v| !v.is_null())
            .or_else(|| obj.get("device"))
            .and_then(coerce_id);
        let icon = obj
            .get("icon")
            .map(label)
            .filter(|s| !s.trim().is_empty());

        Some(Self {
            name: if name.is_empty() { "Unknown".to_string() } else { name },
            command_id,
            device_id,
            icon,
        })
    }
}

/// Parse a macro/favorite list; anything that is not a list yields no items.
pub fn parse_drawer_items(value: Option<&Value>) -> Vec<DrawerItem> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(DrawerItem::from_value).collect())
        .unwrap_or_default()
}

impl RemoteEntitySnapshot {
    pub fn is_unavailable(&self) -> bool {
        self.state == UNAVAILABLE
    }

    pub fn current_activity_id(&self) -> Option<i64> {
        self.attributes
            .get("current_activity_id")
            .and_then(coerce_id)
    }

    /// `current_activity` attribute, if non-empty
    pub fn current_activity_label(&self) -> Option<String> {
        self.attributes
            .get("current_activity")
            .map(label)
            .filter(|s| !s.is_empty())
    }

    /// Raw `activities` list (empty when missing or not a list)
    pub fn raw_activities(&self) -> &[Value] {
        self.attributes
            .get("activities")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Per-activity mapping for `kind`, if the attribute is an object
    pub fn keyed(&self, kind: KeyedList) -> Option<&Map<String, Value>> {
        self.attributes.get(kind.attribute()).and_then(Value::as_object)
    }

    /// Entry for `activity_id` in the `kind` mapping.
    ///
    /// `Some` means the key is present, even if its value is an empty list.
    pub fn keyed_entry(&self, kind: KeyedList, activity_id: i64) -> Option<&Value> {
        self.keyed(kind)?.get(&activity_id.to_string())
    }

    /// Upper-cased `hub_version` attribute
    pub fn hub_version(&self) -> String {
        self.attributes
            .get("hub_version")
            .map(label)
            .unwrap_or_default()
            .to_uppercase()
    }

    pub fn load_state(&self) -> Option<&str> {
        self.attributes.get("load_state").and_then(Value::as_str)
    }

    pub fn is_loading(&self) -> bool {
        self.load_state() == Some("loading")
    }
}

/// Coerce a JSON value to a finite number.
///
/// Numbers and numeric strings are accepted; everything else, including
/// blank strings, is rejected.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Coerce a JSON value to an integral identifier
pub fn coerce_id(value: &Value) -> Option<i64> {
    let n = coerce_number(value)?;
    if n.fract() != 0.0 || n < i64::MIN as f64 || n > i64::MAX as f64 {
        return None;
    }
    Some(n as i64)
}

/// Render a scalar attribute as a label
fn label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}
