use crate::entity::KeyedList;
use serde_json::Value;
use std::collections::HashMap;

/// Client-side memory of what the hub has reported.
///
/// The hub integration drops per-activity attributes when switching
/// activities and clears the activity list when everything powers off.
/// Entries are never expired; the whole cache goes away with its session.
#[derive(Debug, Default, Clone)]
pub struct HubCache {
    activities: Option<Vec<Value>>,
    lists: HashMap<KeyedList, HashMap<String, Vec<Value>>>,
}

impl HubCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last non-empty activity list seen
    pub fn activities(&self) -> Option<&[Value]> {
        self.activities.as_deref()
    }

    pub fn store_activities(&mut self, activities: &[Value]) {
        if !activities.is_empty() {
            self.activities = Some(activities.to_vec());
        }
    }

    /// Remember the `kind` list for an activity. Non-list values are stored
    /// as an empty list: the key was present, so the answer is "nothing".
    pub fn store(&mut self, kind: KeyedList, activity_id: i64, value: &Value) {
        let list = value.as_array().cloned().unwrap_or_default();
        self.lists
            .entry(kind)
            .or_default()
            .insert(activity_id.to_string(), list);
    }

    pub fn get(&self, kind: KeyedList, activity_id: i64) -> Option<&Vec<Value>> {
        self.lists.get(&kind)?.get(&activity_id.to_string())
    }

    pub fn contains(&self, kind: KeyedList, activity_id: i64) -> bool {
        self.get(kind, activity_id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_none() && self.lists.values().all(HashMap::is_empty)
    }
}
