use super::buttons::{Key, KeyGroup};
use crate::activity::ActivityTracker;
use crate::config::RemoteConfig;
use crate::dispatch::DrawerKind;
use crate::entity::DrawerItem;
use crate::favorites::CustomFavorite;
use crate::integration::Integration;
use crate::reconcile::{ReconciledState, POWERED_OFF};
use serde::Serialize;
use std::fmt;
use tokio::time::Instant;

/// Banner shown above the keys
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Warning {
    Unavailable,
    NoActivities,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::Unavailable => write!(
                f,
                "Remote is unavailable (possibly because the Sofabaton app is connected)."
            ),
            Warning::NoActivities => write!(f, "No activities found in remote attributes."),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ActivitySelector {
    pub visible: bool,
    pub options: Vec<String>,
    pub selected: String,
    pub enabled: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct KeyState {
    pub key: Key,
    pub id: i64,
    pub visible: bool,
    pub enabled: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct DrawerButton {
    pub visible: bool,
    pub enabled: bool,
}

/// Everything a front end needs to draw the remote
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RemoteView {
    pub entity_id: String,
    pub integration: Integration,
    pub available: bool,
    pub powered_off: bool,
    pub is_x2: bool,
    pub selector: ActivitySelector,
    pub loading: bool,
    pub warning: Option<Warning>,
    pub keys: Vec<KeyState>,
    pub macros_button: DrawerButton,
    pub favorites_button: DrawerButton,
    pub open_drawer: Option<DrawerKind>,
    pub macros: Vec<DrawerItem>,
    pub favorites: Vec<DrawerItem>,
    pub custom_favorites: Vec<CustomFavorite>,
    pub theme: Option<String>,
    pub background: Option<String>,
    pub max_width: Option<String>,
}

impl RemoteView {
    pub fn key(&self, key: Key) -> Option<&KeyState> {
        self.keys.iter().find(|k| k.key == key)
    }
}

fn group_shown(config: &RemoteConfig, group: KeyGroup, is_x2: bool) -> bool {
    match group {
        KeyGroup::Dpad => config.show_dpad,
        KeyGroup::Nav => config.show_nav,
        KeyGroup::Mid => config.show_mid,
        KeyGroup::Media => config.show_media,
        KeyGroup::Colors => config.show_colors,
        KeyGroup::Abc => config.show_abc && is_x2,
    }
}

/// Macros and favorites buttons for the current state
pub(crate) fn drawer_buttons(
    config: &RemoteConfig,
    state: Option<&ReconciledState>,
    custom_favorites: usize,
) -> (DrawerButton, DrawerButton) {
    let available = state.is_some_and(|s| s.available);
    let macros = state.map_or(0, |s| s.macros.len());
    let favorites = state.map_or(0, |s| s.favorites.len()) + custom_favorites;

    (
        DrawerButton {
            visible: config.show_macros_button(),
            enabled: available && macros > 0,
        },
        DrawerButton {
            visible: config.show_favorites_button(),
            enabled: available && favorites > 0,
        },
    )
}

pub(crate) struct ViewInputs<'a> {
    pub config: &'a RemoteConfig,
    pub integration: Integration,
    pub state: Option<&'a ReconciledState>,
    pub tracker: &'a ActivityTracker,
    pub custom_favorites: &'a [CustomFavorite],
    pub open_drawer: Option<DrawerKind>,
    pub now: Instant,
}

pub(crate) fn build_view(inputs: ViewInputs<'_>) -> RemoteView {
    let ViewInputs {
        config,
        integration,
        state,
        tracker,
        custom_favorites,
        open_drawer,
        now,
    } = inputs;

    let available = state.is_some_and(|s| s.available);
    let powered_off = state.is_some_and(|s| s.available && s.powered_off);
    let is_x2 = state.is_some_and(|s| s.is_x2);

    let selector = match state.filter(|s| s.available) {
        Some(s) => {
            let mut options = vec![POWERED_OFF.to_string()];
            options.extend(s.activities.iter().map(|a| a.name.clone()));
            ActivitySelector {
                visible: config.show_activity,
                enabled: options.len() > 1,
                selected: tracker.displayed(s.display_label(), now).to_string(),
                options,
            }
        }
        None => ActivitySelector {
            visible: config.show_activity,
            options: Vec::new(),
            selected: String::new(),
            enabled: false,
        },
    };

    let warning = match state {
        Some(s) if !s.available => Some(Warning::Unavailable),
        Some(s) if s.activities.is_empty() && !s.backend_loading => Some(Warning::NoActivities),
        _ => None,
    };

    let keys = Key::ALL
        .into_iter()
        .map(|key| {
            let visible = group_shown(config, key.group(), is_x2) && (!key.is_x2_only() || is_x2);
            let enabled = available
                && !powered_off
                && state.is_some_and(|s| s.enabled_keys.allows(key.id()));
            KeyState {
                key,
                id: key.id(),
                visible,
                enabled,
            }
        })
        .collect();

    let (macros_button, favorites_button) =
        drawer_buttons(config, state, custom_favorites.len());

    RemoteView {
        entity_id: config.entity.clone(),
        integration,
        available,
        powered_off,
        is_x2,
        selector,
        loading: tracker.is_loading(now),
        warning,
        keys,
        macros_button,
        favorites_button,
        open_drawer,
        macros: state.map(|s| s.macros.clone()).unwrap_or_default(),
        favorites: state.map(|s| s.favorites.clone()).unwrap_or_default(),
        custom_favorites: custom_favorites.to_vec(),
        theme: Some(config.theme.trim().to_string()).filter(|t| !t.is_empty()),
        background: config.background_css(),
        max_width: config.max_width.to_css(),
    }
}
