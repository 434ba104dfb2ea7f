use crate::entity::KeyedList;

/// Command understood by the hub integration's `send_command` service.
///
/// The hub takes an ordered list of `key:value` tokens instead of a numeric
/// command/device pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HubCommand {
    RequestBasicData,
    RequestAssignedKeys { activity_id: i64 },
    RequestMacroKeys { activity_id: i64 },
    RequestFavoriteKeys { activity_id: i64 },
    StartActivity { activity_id: i64 },
    StopActivity { activity_id: i64 },
    SendAssignedKey { activity_id: i64, key_id: i64 },
    SendMacroKey { activity_id: i64, key_id: i64 },
    SendFavoriteKey { device_id: i64, key_id: i64 },
}

impl HubCommand {
    /// Discovery request for one per-activity list
    pub fn request_for(kind: KeyedList, activity_id: i64) -> Self {
        match kind {
            KeyedList::AssignedKeys => HubCommand::RequestAssignedKeys { activity_id },
            KeyedList::MacroKeys => HubCommand::RequestMacroKeys { activity_id },
            KeyedList::FavoriteKeys => HubCommand::RequestFavoriteKeys { activity_id },
        }
    }

    pub fn tokens(&self) -> Vec<String> {
        match self {
            HubCommand::RequestBasicData => vec!["type:request_basic_data".to_string()],
            HubCommand::RequestAssignedKeys { activity_id } => {
                typed("request_assigned_keys", &[("activity_id", *activity_id)])
            }
            HubCommand::RequestMacroKeys { activity_id } => {
                typed("request_macro_keys", &[("activity_id", *activity_id)])
            }
            HubCommand::RequestFavoriteKeys { activity_id } => {
                typed("request_favorite_keys", &[("activity_id", *activity_id)])
            }
            HubCommand::StartActivity { activity_id } => {
                typed("start_activity", &[("activity_id", *activity_id)])
            }
            HubCommand::StopActivity { activity_id } => {
                typed("stop_activity", &[("activity_id", *activity_id)])
            }
            HubCommand::SendAssignedKey { activity_id, key_id } => typed(
                "send_assigned_key",
                &[("activity_id", *activity_id), ("key_id", *key_id)],
            ),
            HubCommand::SendMacroKey { activity_id, key_id } => typed(
                "send_macro_key",
                &[("activity_id", *activity_id), ("key_id", *key_id)],
            ),
            HubCommand::SendFavoriteKey { device_id, key_id } => typed(
                "send_favorite_key",
                &[("device_id", *device_id), ("key_id", *key_id)],
            ),
        }
    }

    /// De-dupe key for discovery requests; `None` for user commands
    pub fn request_key(&self, entity_id: &str) -> Option<String> {
        match self {
            HubCommand::RequestBasicData => Some(format!("req:basic:{}", entity_id)),
            HubCommand::RequestAssignedKeys { activity_id } => {
                Some(format!("req:assigned:{}", activity_id))
            }
            HubCommand::RequestMacroKeys { activity_id } => Some(format!("req:macro:{}", activity_id)),
            HubCommand::RequestFavoriteKeys { activity_id } => Some(format!("req:fav:{}", activity_id)),
            _ => None,
        }
    }
}

fn typed(kind: &str, fields: &[(&str, i64)]) -> Vec<String> {
    let mut tokens = Vec::with_capacity(fields.len() + 1);
    tokens.push(format!("type:{}", kind));
    for (name, value) in fields {
        tokens.push(format!("{}:{}", name, value));
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_vocabulary() {
        assert_eq!(HubCommand::RequestBasicData.tokens(), vec!["type:request_basic_data"]);
        assert_eq!(
            HubCommand::StartActivity { activity_id: 7 }.tokens(),
            vec!["type:start_activity", "activity_id:7"]
        );
        assert_eq!(
            HubCommand::StopActivity { activity_id: 3 }.tokens(),
            vec!["type:stop_activity", "activity_id:3"]
        );
        assert_eq!(
            HubCommand::SendAssignedKey { activity_id: 7, key_id: 174 }.tokens(),
            vec!["type:send_assigned_key", "activity_id:7", "key_id:174"]
        );
        assert_eq!(
            HubCommand::SendMacroKey { activity_id: 7, key_id: 2 }.tokens(),
            vec!["type:send_macro_key", "activity_id:7", "key_id:2"]
        );
        assert_eq!(
            HubCommand::SendFavoriteKey { device_id: 4, key_id: 9 }.tokens(),
            vec!["type:send_favorite_key", "device_id:4", "key_id:9"]
        );
        assert_eq!(
            HubCommand::request_for(KeyedList::FavoriteKeys, 7).tokens(),
            vec!["type:request_favorite_keys", "activity_id:7"]
        );
    }

    #[test]
    fn test_request_keys() {
        assert_eq!(
            HubCommand::RequestBasicData.request_key("remote.hub").as_deref(),
            Some("req:basic:remote.hub")
        );
        assert_eq!(
            HubCommand::request_for(KeyedList::AssignedKeys, 7).request_key("remote.hub").as_deref(),
            Some("req:assigned:7")
        );
        assert_eq!(
            HubCommand::request_for(KeyedList::MacroKeys, 7).request_key("x").as_deref(),
            Some("req:macro:7")
        );
        assert_eq!(
            HubCommand::request_for(KeyedList::FavoriteKeys, 7).request_key("x").as_deref(),
            Some("req:fav:7")
        );
        assert_eq!(HubCommand::StartActivity { activity_id: 7 }.request_key("x"), None);
    }
}
