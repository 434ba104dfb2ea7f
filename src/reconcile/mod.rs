//! State reconciliation.
//!
//! Turns a raw, possibly partial entity snapshot into the normalized state
//! the panel renders. On the hub variant the snapshot is merged with the
//! session's [`HubCache`], and any per-activity data still missing from both
//! is returned as discovery requests for the caller to queue.

use crate::entity::{parse_drawer_items, Activity, DrawerItem, KeyedList, RemoteEntitySnapshot};
use crate::hub::{HubCache, HubCommand};
use crate::integration::Integration;
use serde_json::Value;


/// Selector option (and fallback label) for "no activity running"
pub const POWERED_OFF: &str = "Powered Off";

const POWERED_OFF_LABELS: [&str; 3] = ["powered off", "powered_off", "off"];

/// True for "Powered Off", "powered_off", "OFF " and friends
pub fn is_powered_off_label(label: &str) -> bool {
    let normalized = label.trim().to_lowercase();
    POWERED_OFF_LABELS.contains(&normalized.as_str())
}

/// Whether `activity_id` is confirmed running.
///
/// An explicit per-activity state wins; otherwise the current-activity label
/// has to be present and not an off label.
pub fn is_activity_on(activity_id: i64, activities: &[Activity], current_label: &str) -> bool {
    if let Some(activity) = activities.iter().find(|a| a.id == activity_id) {
        if !activity.state.trim().is_empty() {
            return !is_powered_off_label(&activity.state);
        }
    }
    !current_label.trim().is_empty() && !is_powered_off_label(current_label)
}

/// A key the backend reports as valid, with the device it targets
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssignedKey {
    pub command: i64,
    pub activity_id: Option<i64>,
}

/// Which keys are usable for the current activity.
///
/// Fail-open: when the backend never reported keys, reported something that
/// is not a list, or a list with no usable ids, every key is enabled.
#[derive(Clone, Debug, PartialEq)]
pub enum EnabledKeys {
    All,
    Only(Vec<AssignedKey>),
}

impl EnabledKeys {
    pub fn from_raw(raw: Option<&Value>, activity_id: Option<i64>) -> Self {
        let Some(items) = raw.and_then(Value::as_array) else {
            return EnabledKeys::All;
        };
        let parsed: Vec<AssignedKey> = items
            .iter()
            .filter_map(crate::entity::coerce_id)
            .map(|command| AssignedKey {
                command,
                activity_id,
            })
            .collect();
        if parsed.is_empty() {
            EnabledKeys::All
        } else {
            EnabledKeys::Only(parsed)
        }
    }

    pub fn allows(&self, key_id: i64) -> bool {
        match self {
            EnabledKeys::All => true,
            EnabledKeys::Only(keys) => keys.iter().any(|k| k.command == key_id),
        }
    }

    /// Per-key target override, if the backend assigned this key
    pub fn target(&self, key_id: i64) -> Option<&AssignedKey> {
        match self {
            EnabledKeys::All => None,
            EnabledKeys::Only(keys) => keys.iter().find(|k| k.command == key_id),
        }
    }
}

/// Normalized remote state for one update tick
#[derive(Clone, Debug, PartialEq)]
pub struct ReconciledState {
    pub available: bool,
    pub current_activity_id: Option<i64>,
    /// Authoritative current-activity label; empty when unknown
    pub current_activity: String,
    pub powered_off: bool,
    pub activities: Vec<Activity>,
    pub enabled_keys: EnabledKeys,
    pub macros: Vec<DrawerItem>,
    pub favorites: Vec<DrawerItem>,
    /// X2 hardware (hub integration, or a direct remote reporting an X2 hub)
    pub is_x2: bool,
    /// Backend reports it is still loading its data
    pub backend_loading: bool,
}

impl ReconciledState {
    /// Label the selector shows when nothing is pending
    pub fn display_label(&self) -> &str {
        if self.current_activity.is_empty() {
            POWERED_OFF
        } else {
            &self.current_activity
        }
    }

    pub fn activity_by_name(&self, name: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.name == name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Reconciliation {
    pub state: ReconciledState,
    /// Discovery requests for data missing from both snapshot and cache
    pub requests: Vec<HubCommand>,
}

/// Reconcile a snapshot against the hub cache.
///
/// The cache is only read or written on the hub variant.
pub fn reconcile(
    snapshot: &RemoteEntitySnapshot,
    integration: Integration,
    cache: &mut HubCache,
) -> Reconciliation {
    let hub = integration.is_hub();
    let available = !snapshot.is_unavailable();
    let activity_id = snapshot.current_activity_id();

    // The hub clears `activities` when everything powers off; keep the last list.
    let raw_activities = snapshot.raw_activities();
    if hub {
        cache.store_activities(raw_activities);
    }
    let source: &[Value] = if !raw_activities.is_empty() {
        raw_activities
    } else if hub {
        cache.activities().unwrap_or(&[])
    } else {
        &[]
    };
    let activities: Vec<Activity> = source.iter().filter_map(Activity::from_value).collect();

    let current_activity = snapshot
        .current_activity_label()
        .or_else(|| {
            activities
                .iter()
                .find(|a| Some(a.id) == activity_id)
                .map(|a| a.name.clone())
        })
        .unwrap_or_default();
    let powered_off = activity_id.is_none()
        || current_activity.is_empty()
        || is_powered_off_label(&current_activity);

    let mut lists: [Option<Value>; 3] = [None, None, None];
    if let Some(id) = activity_id {
        for (slot, kind) in lists.iter_mut().zip(KeyedList::ALL) {
            match snapshot.keyed_entry(kind, id) {
                Some(value) => {
                    if hub {
                        cache.store(kind, id, value);
                    }
                    *slot = Some(value.clone());
                }
                None if hub => {
                    *slot = cache.get(kind, id).map(|items| Value::Array(items.clone()));
                }
                None => {}
            }
        }
    }
    let [assigned, macros, favorites] = lists;

    let mut requests = Vec::new();
    if hub && available {
        if activities.is_empty() && !snapshot.is_loading() {
            requests.push(HubCommand::RequestBasicData);
        }
        // Querying an activity that is still starting is unreliable on the bridge.
        if let Some(id) = activity_id {
            if is_activity_on(id, &activities, &current_activity) {
                for kind in KeyedList::ALL {
                    if !cache.contains(kind, id) {
                        requests.push(HubCommand::request_for(kind, id));
                    }
                }
            }
        }
    }

    let state = ReconciledState {
        available,
        current_activity_id: activity_id,
        current_activity,
        powered_off,
        enabled_keys: EnabledKeys::from_raw(assigned.as_ref(), activity_id),
        macros: parse_drawer_items(macros.as_ref()),
        favorites: parse_drawer_items(favorites.as_ref()),
        activities,
        is_x2: hub || snapshot.hub_version().contains("X2"),
        backend_loading: snapshot.is_loading(),
    };

    Reconciliation { state, requests }
}
