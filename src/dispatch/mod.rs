//! Translate user actions into backend calls.
//!
//! The two integrations accept very different call shapes for the same
//! action, so each has its own [`CommandDispatcher`]; the controller picks
//! one from the detected [`Integration`]. Dispatchers are pure: they build an
//! [`Outbound`] and leave sending (and queueing) to the caller.

use crate::entity::DrawerItem;
use crate::hub::HubCommand;
use crate::integration::Integration;
use crate::reconcile::{is_powered_off_label, ReconciledState};
use crate::service::ServiceCall;
use serde::Serialize;
use serde_json::json;
use std::fmt;


/// Which drawer an item was pressed in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawerKind {
    Macros,
    Favorites,
}

/// A backend call ready to be issued
#[derive(Clone, Debug, PartialEq)]
pub enum Outbound {
    /// Plain service call (direct integration)
    Service(ServiceCall),
    /// Token command for the hub queue
    Hub(HubCommand),
}

/// Reasons a single send is dropped without reaching the backend
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchSkip {
    InvalidCommand,
    InvalidDevice,
    NoCurrentActivity,
    UnknownActivity(String),
    EmptySelection,
    AlreadyCurrent(String),
    /// The control is disabled in the current view
    Disabled,
    NoSuchItem(usize),
}

impl fmt::Display for DispatchSkip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchSkip::InvalidCommand => write!(f, "command id is not a finite number"),
            DispatchSkip::InvalidDevice => write!(f, "device id is not a finite number"),
            DispatchSkip::NoCurrentActivity => write!(f, "no current activity to target"),
            DispatchSkip::UnknownActivity(name) => write!(f, "unknown activity '{}'", name),
            DispatchSkip::EmptySelection => write!(f, "empty activity selection"),
            DispatchSkip::AlreadyCurrent(name) => write!(f, "'{}' is already the current activity", name),
            DispatchSkip::Disabled => write!(f, "control is disabled"),
            DispatchSkip::NoSuchItem(index) => write!(f, "no item at position {}", index),
        }
    }
}

impl std::error::Error for DispatchSkip {}

/// Builds backend calls for one integration variant.
///
/// `entity_id` is the bound remote entity; `state` is the latest reconciled
/// state, used to resolve the current activity and per-key targets.
pub trait CommandDispatcher: Send + Sync {
    fn integration(&self) -> Integration;

    /// Remote button with a catalogue key id
    fn press_key(
        &self,
        entity_id: &str,
        key_id: i64,
        state: &ReconciledState,
    ) -> Result<Outbound, DispatchSkip>;

    /// Macro or favorite reported by the backend
    fn press_drawer_item(
        &self,
        entity_id: &str,
        kind: DrawerKind,
        item: &DrawerItem,
        state: &ReconciledState,
    ) -> Result<Outbound, DispatchSkip>;

    /// Custom favorite configured with explicit ids
    fn press_favorite(
        &self,
        entity_id: &str,
        command_id: i64,
        device_id: Option<i64>,
        state: &ReconciledState,
    ) -> Result<Outbound, DispatchSkip>;

    /// Activity selector change. The caller has already checked the option
    /// against the current label.
    fn select_activity(
        &self,
        entity_id: &str,
        option: &str,
        state: &ReconciledState,
    ) -> Result<Outbound, DispatchSkip>;
}

/// Dispatcher for the detected integration
pub fn dispatcher_for(integration: Integration) -> Box<dyn CommandDispatcher> {
    match integration {
        Integration::Direct => Box::new(DirectDispatcher),
        Integration::Hub => Box::new(HubDispatcher),
    }
}

/// Per-button override, then the current activity
fn key_target(key_id: i64, state: &ReconciledState) -> Result<i64, DispatchSkip> {
    state
        .enabled_keys
        .target(key_id)
        .and_then(|k| k.activity_id)
        .or(state.current_activity_id)
        .ok_or(DispatchSkip::NoCurrentActivity)
}

/// Check that the selection is something to act on
pub fn validate_selection(option: &str, state: &ReconciledState) -> Result<(), DispatchSkip> {
    if option.is_empty() {
        return Err(DispatchSkip::EmptySelection);
    }
    if option == state.current_activity {
        return Err(DispatchSkip::AlreadyCurrent(option.to_string()));
    }
    Ok(())
}

pub struct DirectDispatcher;

impl DirectDispatcher {
    fn send_command(entity_id: &str, command: i64, device: i64) -> Outbound {
        Outbound::Service(ServiceCall::remote(
            "send_command",
            json!({
                "entity_id": entity_id,
                "command": command,
                "device": device,
            }),
        ))
    }
}

impl CommandDispatcher for DirectDispatcher {
    fn integration(&self) -> Integration {
        Integration::Direct
    }

    fn press_key(
        &self,
        entity_id: &str,
        key_id: i64,
        state: &ReconciledState,
    ) -> Result<Outbound, DispatchSkip> {
        let device = key_target(key_id, state)?;
        Ok(Self::send_command(entity_id, key_id, device))
    }

    fn press_drawer_item(
        &self,
        entity_id: &str,
        _kind: DrawerKind,
        item: &DrawerItem,
        state: &ReconciledState,
    ) -> Result<Outbound, DispatchSkip> {
        let command = item.command_id.ok_or(DispatchSkip::InvalidCommand)?;
        let device = match item.device_id {
            Some(device) => device,
            None => key_target(command, state)?,
        };
        Ok(Self::send_command(entity_id, command, device))
    }

    fn press_favorite(
        &self,
        entity_id: &str,
        command_id: i64,
        device_id: Option<i64>,
        state: &ReconciledState,
    ) -> Result<Outbound, DispatchSkip> {
        let device = device_id
            .or(state.current_activity_id)
            .ok_or(DispatchSkip::NoCurrentActivity)?;
        Ok(Self::send_command(entity_id, command_id, device))
    }

    fn select_activity(
        &self,
        entity_id: &str,
        option: &str,
        _state: &ReconciledState,
    ) -> Result<Outbound, DispatchSkip> {
        let call = if is_powered_off_label(option) {
            ServiceCall::remote("turn_off", json!({ "entity_id": entity_id }))
        } else {
            ServiceCall::remote(
                "turn_on",
                json!({ "entity_id": entity_id, "activity": option }),
            )
        };
        Ok(Outbound::Service(call))
    }
}

pub struct HubDispatcher;

impl CommandDispatcher for HubDispatcher {
    fn integration(&self) -> Integration {
        Integration::Hub
    }

    fn press_key(
        &self,
        _entity_id: &str,
        key_id: i64,
        state: &ReconciledState,
    ) -> Result<Outbound, DispatchSkip> {
        let activity_id = key_target(key_id, state)?;
        Ok(Outbound::Hub(HubCommand::SendAssignedKey { activity_id, key_id }))
    }

    fn press_drawer_item(
        &self,
        _entity_id: &str,
        kind: DrawerKind,
        item: &DrawerItem,
        state: &ReconciledState,
    ) -> Result<Outbound, DispatchSkip> {
        let key_id = item.command_id.ok_or(DispatchSkip::InvalidCommand)?;
        let command = match kind {
            DrawerKind::Macros => HubCommand::SendMacroKey {
                activity_id: item
                    .device_id
                    .or(state.current_activity_id)
                    .ok_or(DispatchSkip::NoCurrentActivity)?,
                key_id,
            },
            // Favorites address a device, which only the item itself knows
            DrawerKind::Favorites => HubCommand::SendFavoriteKey {
                device_id: item.device_id.ok_or(DispatchSkip::InvalidDevice)?,
                key_id,
            },
        };
        Ok(Outbound::Hub(command))
    }

    fn press_favorite(
        &self,
        _entity_id: &str,
        command_id: i64,
        device_id: Option<i64>,
        state: &ReconciledState,
    ) -> Result<Outbound, DispatchSkip> {
        let device_id = device_id
            .or(state.current_activity_id)
            .ok_or(DispatchSkip::NoCurrentActivity)?;
        Ok(Outbound::Hub(HubCommand::SendFavoriteKey {
            device_id,
            key_id: command_id,
        }))
    }

    fn select_activity(
        &self,
        _entity_id: &str,
        option: &str,
        state: &ReconciledState,
    ) -> Result<Outbound, DispatchSkip> {
        if is_powered_off_label(option) {
            let activity_id = state
                .current_activity_id
                .ok_or(DispatchSkip::NoCurrentActivity)?;
            return Ok(Outbound::Hub(HubCommand::StopActivity { activity_id }));
        }

        let activity = state
            .activity_by_name(option)
            .ok_or_else(|| DispatchSkip::UnknownActivity(option.to_string()))?;
        Ok(Outbound::Hub(HubCommand::StartActivity {
            activity_id: activity.id,
        }))
    }
}
