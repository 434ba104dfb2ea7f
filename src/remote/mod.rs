//! Remote controller.
//!
//! Owns one entity binding: integration detection, the hub session, the
//! activity tracker and the last reconciled state. The host feeds it entity
//! snapshots and user actions; it answers with a [`RemoteView`] and issues
//! backend calls through the [`ServiceCaller`].

mod buttons;
mod view;

pub use buttons::{Key, KeyGroup};
pub use view::{ActivitySelector, DrawerButton, KeyState, RemoteView, Warning};

use crate::activity::ActivityTracker;
use crate::config::{ConfigError, RemoteConfig, TimingConfig};
use crate::dispatch::{dispatcher_for, validate_selection, DispatchSkip, DrawerKind, Outbound};
use crate::entity::RemoteEntitySnapshot;
use crate::favorites::{normalize_custom_favorites, ActionOutcome, CustomFavorite, HostAction};
use crate::hub::HubSession;
use crate::integration::{EntityRegistry, Integration, IntegrationDetector};
use crate::reconcile::{reconcile, ReconciledState};
use crate::service::{ServiceCall, ServiceCaller};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use view::{build_view, drawer_buttons, ViewInputs};


pub struct RemoteController {
    config: RemoteConfig,
    timing: TimingConfig,
    detector: IntegrationDetector,
    caller: Arc<dyn ServiceCaller>,
    session: HubSession,
    tracker: ActivityTracker,
    custom_favorites: Vec<CustomFavorite>,
    open_drawer: Option<DrawerKind>,
    state: Option<ReconciledState>,
}

impl RemoteController {
    pub fn new(
        config: RemoteConfig,
        registry: Arc<dyn EntityRegistry>,
        caller: Arc<dyn ServiceCaller>,
        timing: TimingConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let detector = IntegrationDetector::new(registry);
        detector.bind(&config.entity);
        let session = HubSession::new(&config.entity, caller.clone(), timing.clone());

        info!(entity_id = %config.entity, "Remote controller bound");
        Ok(Self {
            custom_favorites: normalize_custom_favorites(&config.custom_favorites),
            tracker: ActivityTracker::new(timing.clone()),
            config,
            timing,
            detector,
            caller,
            session,
            open_drawer: None,
            state: None,
        })
    }

    pub fn entity_id(&self) -> &str {
        &self.config.entity
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Integration as currently known (direct until detection succeeds)
    pub fn integration(&self) -> Integration {
        self.detector.integration()
    }

    pub fn session(&self) -> &HubSession {
        &self.session
    }

    /// Last reconciled state, if any snapshot has been seen
    pub fn state(&self) -> Option<&ReconciledState> {
        self.state.as_ref()
    }

    /// Apply new options. Moving to another entity discards everything tied
    /// to the old one before anything else happens.
    pub fn set_config(&mut self, config: RemoteConfig) -> Result<(), ConfigError> {
        config.validate()?;

        if self.detector.bind(&config.entity) {
            self.session.shutdown();
            self.session = HubSession::new(&config.entity, self.caller.clone(), self.timing.clone());
            self.tracker.reset();
            self.state = None;
            self.open_drawer = None;
        }

        self.custom_favorites = normalize_custom_favorites(&config.custom_favorites);
        self.config = config;
        self.close_hidden_drawer();
        Ok(())
    }

    /// Process a state push for the bound entity and return the new view.
    pub async fn update(&mut self, snapshot: &RemoteEntitySnapshot) -> RemoteView {
        if snapshot.entity_id != self.config.entity {
            debug!(
                entity_id = %self.config.entity,
                snapshot_entity = %snapshot.entity_id,
                "Ignoring snapshot for another entity"
            );
            return self.view();
        }

        let integration = self.detector.ensure(&self.config.entity).await;
        let result = reconcile(snapshot, integration, self.session.cache_mut());

        if integration.is_hub() {
            for request in result.requests {
                self.session.request(request);
            }
        }

        self.tracker.reconcile(&result.state, Instant::now());
        self.state = Some(result.state);
        self.close_hidden_drawer();
        self.view()
    }

    pub fn view(&self) -> RemoteView {
        build_view(ViewInputs {
            config: &self.config,
            integration: self.detector.integration(),
            state: self.state.as_ref(),
            tracker: &self.tracker,
            custom_favorites: &self.custom_favorites,
            open_drawer: self.open_drawer,
            now: Instant::now(),
        })
    }

    /// Press a remote key by command id
    pub async fn press_key(&mut self, key_id: i64) -> Result<(), DispatchSkip> {
        let result = self.try_press_key(key_id).await;
        self.log_skip("key", &result);
        result
    }

    async fn try_press_key(&mut self, key_id: i64) -> Result<(), DispatchSkip> {
        let state = self.state.as_ref().ok_or(DispatchSkip::NoCurrentActivity)?;
        if !state.available || state.powered_off || !state.enabled_keys.allows(key_id) {
            return Err(DispatchSkip::Disabled);
        }

        let outbound = dispatcher_for(self.integration()).press_key(&self.config.entity, key_id, state)?;
        self.tracker.pulse(Instant::now());
        self.send(outbound).await;
        Ok(())
    }

    /// Press the `index`-th backend macro or favorite
    pub async fn press_drawer_item(
        &mut self,
        kind: DrawerKind,
        index: usize,
    ) -> Result<(), DispatchSkip> {
        let result = self.try_press_drawer_item(kind, index).await;
        self.log_skip("drawer item", &result);
        result
    }

    async fn try_press_drawer_item(
        &mut self,
        kind: DrawerKind,
        index: usize,
    ) -> Result<(), DispatchSkip> {
        let state = self.state.as_ref().ok_or(DispatchSkip::NoSuchItem(index))?;
        let items = match kind {
            DrawerKind::Macros => &state.macros,
            DrawerKind::Favorites => &state.favorites,
        };
        let item = items.get(index).ok_or(DispatchSkip::NoSuchItem(index))?;

        let outbound = dispatcher_for(self.integration()).press_drawer_item(
            &self.config.entity,
            kind,
            item,
            state,
        )?;
        self.tracker.pulse(Instant::now());
        self.send(outbound).await;
        Ok(())
    }

    /// Press the `index`-th custom favorite (position in the normalized list).
    ///
    /// Returns the host-side action to perform, if the favorite carries one.
    pub async fn press_custom_favorite(
        &mut self,
        index: usize,
    ) -> Result<Option<HostAction>, DispatchSkip> {
        let result = self.try_press_custom_favorite(index).await;
        self.log_skip("custom favorite", &result);
        result
    }

    async fn try_press_custom_favorite(
        &mut self,
        index: usize,
    ) -> Result<Option<HostAction>, DispatchSkip> {
        let favorite = self
            .custom_favorites
            .get(index)
            .cloned()
            .ok_or(DispatchSkip::NoSuchItem(index))?;

        if let Some(action) = &favorite.action {
            return Ok(match action.resolve() {
                ActionOutcome::Service(call) => {
                    self.call(&call).await;
                    None
                }
                ActionOutcome::Host(host) => Some(host),
                ActionOutcome::Nothing => None,
            });
        }

        let command_id = favorite.command_id.ok_or(DispatchSkip::InvalidCommand)?;
        let state = self.state.as_ref().ok_or(DispatchSkip::NoCurrentActivity)?;
        let outbound = dispatcher_for(self.integration()).press_favorite(
            &self.config.entity,
            command_id,
            favorite.device_id,
            state,
        )?;
        self.tracker.pulse(Instant::now());
        self.send(outbound).await;
        Ok(None)
    }

    /// Activity selector change
    pub async fn select_activity(&mut self, option: &str) -> Result<(), DispatchSkip> {
        let result = self.try_select_activity(option).await;
        self.log_skip("activity selection", &result);
        result
    }

    async fn try_select_activity(&mut self, option: &str) -> Result<(), DispatchSkip> {
        let state = self.state.as_ref().ok_or(DispatchSkip::Disabled)?;
        if !state.available {
            return Err(DispatchSkip::Disabled);
        }
        validate_selection(option, state)?;

        self.tracker.begin(option, Instant::now());
        let outbound =
            dispatcher_for(self.integration()).select_activity(&self.config.entity, option, state)?;
        self.send(outbound).await;
        Ok(())
    }

    /// Open `kind`'s drawer, or close it if it is already open.
    ///
    /// Hidden or disabled drawer buttons do nothing.
    pub fn toggle_drawer(&mut self, kind: DrawerKind) -> Option<DrawerKind> {
        let (macros, favorites) =
            drawer_buttons(&self.config, self.state.as_ref(), self.custom_favorites.len());
        let button = match kind {
            DrawerKind::Macros => macros,
            DrawerKind::Favorites => favorites,
        };
        if button.visible && button.enabled {
            self.open_drawer = if self.open_drawer == Some(kind) {
                None
            } else {
                Some(kind)
            };
        }
        self.open_drawer
    }

    fn close_hidden_drawer(&mut self) {
        let hidden = match self.open_drawer {
            Some(DrawerKind::Macros) => !self.config.show_macros_button(),
            Some(DrawerKind::Favorites) => !self.config.show_favorites_button(),
            None => false,
        };
        if hidden {
            self.open_drawer = None;
        }
    }

    async fn send(&self, outbound: Outbound) {
        match outbound {
            Outbound::Service(call) => self.call(&call).await,
            Outbound::Hub(command) => self.session.send(command).await,
        }
    }

    async fn call(&self, call: &ServiceCall) {
        if let Err(e) = self.caller.call_service(call).await {
            warn!(
                entity_id = %self.config.entity,
                domain = %call.domain,
                service = %call.service,
                error = %e,
                "Service call failed"
            );
        }
    }

    fn log_skip<T>(&self, action: &str, result: &Result<T, DispatchSkip>) {
        if let Err(skip) = result {
            debug!(entity_id = %self.config.entity, action = %action, reason = %skip, "Send skipped");
        }
    }
}
