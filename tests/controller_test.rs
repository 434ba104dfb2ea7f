// Integration tests for the remote controller.
//
// The controller is driven with hand-built entity snapshots, a fake entity
// registry and a service caller that records every backend call.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use sofabaton_remote::config::{RemoteConfig, TimingConfig};
use sofabaton_remote::entity::RemoteEntitySnapshot;
use sofabaton_remote::integration::{EntityRegistry, Integration, RegistryEntry};
use sofabaton_remote::remote::{Key, RemoteController};
use sofabaton_remote::service::{ServiceCall, ServiceCaller};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

// ── Fakes ─────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeRegistry {
    platforms: HashMap<String, String>,
    lookups: AtomicUsize,
}

impl FakeRegistry {
    fn with(entries: &[(&str, &str)]) -> Self {
        Self {
            platforms: entries
                .iter()
                .map(|(e, p)| (e.to_string(), p.to_string()))
                .collect(),
            lookups: AtomicUsize::new(0),
        }
    }

    fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityRegistry for FakeRegistry {
    async fn get_entity(&self, entity_id: &str) -> Result<RegistryEntry> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        match self.platforms.get(entity_id) {
            Some(platform) => Ok(RegistryEntry {
                entity_id: entity_id.to_string(),
                platform: platform.clone(),
            }),
            None => Err(anyhow!("entity not found")),
        }
    }
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(Instant, ServiceCall)>>,
}

impl Recorder {
    fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
    }

    fn times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }

    /// Hub token lists sent to `entity_id`
    fn hub_commands(&self, entity_id: &str) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|c| c.service == "send_command" && c.data["entity_id"] == entity_id)
            .filter_map(|c| {
                c.data["command"].as_array().map(|tokens| {
                    tokens
                        .iter()
                        .filter_map(|t| t.as_str().map(str::to_string))
                        .collect()
                })
            })
            .collect()
    }
}

#[async_trait]
impl ServiceCaller for Recorder {
    async fn call_service(&self, call: &ServiceCall) -> Result<()> {
        self.calls.lock().unwrap().push((Instant::now(), call.clone()));
        Ok(())
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

const HUB: &str = "remote.hub";
const X1S: &str = "remote.x1s";

fn snapshot(entity_id: &str, state: &str, attributes: Value) -> RemoteEntitySnapshot {
    RemoteEntitySnapshot {
        entity_id: entity_id.to_string(),
        state: state.to_string(),
        attributes: attributes.as_object().cloned().unwrap_or_default(),
    }
}

fn activities() -> Value {
    json!([
        {"id": 5, "name": "Watch TV"},
        {"id": 7, "name": "Movie Night"}
    ])
}

fn setup(entity_id: &str) -> (RemoteController, Arc<Recorder>, Arc<FakeRegistry>) {
    let registry = Arc::new(FakeRegistry::with(&[
        (HUB, "sofabaton_hub"),
        (X1S, "sofabaton_x1s"),
    ]));
    let recorder = Arc::new(Recorder::default());
    let controller = RemoteController::new(
        RemoteConfig::for_entity(entity_id),
        registry.clone(),
        recorder.clone(),
        TimingConfig::default(),
    )
    .unwrap();
    (controller, recorder, registry)
}

fn tokens(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_direct_button_press() {
    let (mut controller, recorder, _) = setup(X1S);
    controller
        .update(&snapshot(
            X1S,
            "on",
            json!({"current_activity_id": 5, "current_activity": "Watch TV", "activities": activities()}),
        ))
        .await;

    controller.press_key(Key::Up.id()).await.unwrap();

    let calls = recorder.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].domain, "remote");
    assert_eq!(calls[0].service, "send_command");
    assert_eq!(calls[0].data, json!({"entity_id": X1S, "command": 174, "device": 5}));
}

#[tokio::test(start_paused = true)]
async fn test_hub_start_activity_from_powered_off() {
    let (mut controller, recorder, _) = setup(HUB);
    controller
        .update(&snapshot(HUB, "off", json!({"activities": activities()})))
        .await;

    controller.select_activity("Movie Night").await.unwrap();
    assert_eq!(
        recorder.hub_commands(HUB),
        vec![tokens(&["type:start_activity", "activity_id:7"])]
    );

    let view = controller.view();
    assert_eq!(view.selector.selected, "Movie Night");
    assert!(view.loading);

    tokio::time::sleep(Duration::from_secs(4)).await;
    let view = controller
        .update(&snapshot(
            HUB,
            "on",
            json!({
                "current_activity_id": 7,
                "current_activity": "Movie Night",
                "activities": activities()
            }),
        ))
        .await;

    assert_eq!(view.selector.selected, "Movie Night");
    assert!(!view.loading);
    assert!(controller.state().is_some_and(|s| !s.powered_off));
}

#[tokio::test(start_paused = true)]
async fn test_pending_selection_expires() {
    let (mut controller, _, _) = setup(HUB);
    let off = snapshot(HUB, "off", json!({"activities": activities()}));
    controller.update(&off).await;

    controller.select_activity("Movie Night").await.unwrap();
    tokio::time::sleep(Duration::from_secs(16)).await;
    let view = controller.update(&off).await;

    assert_eq!(view.selector.selected, "Powered Off");
    // The loading indicator has its own, longer deadline
    assert!(view.loading);

    tokio::time::sleep(Duration::from_secs(45)).await;
    assert!(!controller.view().loading);
}

#[tokio::test(start_paused = true)]
async fn test_hub_uses_cached_assigned_keys() {
    let (mut controller, recorder, _) = setup(HUB);
    let on = json!({
        "current_activity_id": 7,
        "current_activity": "Movie Night",
        "activities": activities(),
        "macro_keys": {"7": []},
        "favorite_keys": {"7": []}
    });

    let mut first = on.clone();
    first["assigned_keys"] = json!({"7": [174, 176, 178]});
    controller.update(&snapshot(HUB, "on", first)).await;

    let view = controller.update(&snapshot(HUB, "on", on)).await;
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert!(view.key(Key::Down).unwrap().enabled);
    assert!(!view.key(Key::VolUp).unwrap().enabled);
    assert!(recorder.hub_commands(HUB).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_hub_present_empty_assigned_keys() {
    let (mut controller, recorder, _) = setup(HUB);
    let view = controller
        .update(&snapshot(
            HUB,
            "on",
            json!({
                "current_activity_id": 7,
                "current_activity": "Movie Night",
                "activities": activities(),
                "assigned_keys": {"7": []},
                "macro_keys": {"7": []},
                "favorite_keys": {"7": []}
            }),
        ))
        .await;
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert!(view.keys.iter().filter(|k| k.visible).all(|k| k.enabled));
    assert!(recorder.hub_commands(HUB).is_empty());
}

#[tokio::test]
async fn test_invalid_custom_favorite_dropped() {
    let mut config = RemoteConfig::for_entity(X1S);
    config.custom_favorites = vec![
        json!({"name": "Mystery", "command_id": "soon", "action": {"label": "x"}}),
        json!({"name": "Nothing at all"}),
    ];
    let registry = Arc::new(FakeRegistry::default());
    let recorder = Arc::new(Recorder::default());
    let controller =
        RemoteController::new(config, registry, recorder, TimingConfig::default()).unwrap();

    assert!(controller.view().custom_favorites.is_empty());
    assert!(!controller.view().favorites_button.enabled);
}

// ── Hub discovery and queueing ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_hub_discovery_requests() {
    let (mut controller, recorder, _) = setup(HUB);

    // No activities yet: basic data is requested once, however many ticks
    for _ in 0..3 {
        controller.update(&snapshot(HUB, "off", json!({}))).await;
    }
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(recorder.hub_commands(HUB), vec![tokens(&["type:request_basic_data"])]);

    // Activity running but nothing known about it
    let on = snapshot(
        HUB,
        "on",
        json!({
            "current_activity_id": 7,
            "current_activity": "Movie Night",
            "activities": [{"id": 7, "name": "Movie Night", "state": "on"}]
        }),
    );
    controller.update(&on).await;
    controller.update(&on).await;
    tokio::time::sleep(Duration::from_secs(30)).await;

    let commands = recorder.hub_commands(HUB);
    assert_eq!(
        commands[1..].to_vec(),
        vec![
            tokens(&["type:request_assigned_keys", "activity_id:7"]),
            tokens(&["type:request_macro_keys", "activity_id:7"]),
            tokens(&["type:request_favorite_keys", "activity_id:7"]),
        ]
    );
    let times = recorder.times();
    for pair in times[1..].windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(3000));
    }
}

#[tokio::test(start_paused = true)]
async fn test_key_press_jumps_discovery_queue() {
    let (mut controller, recorder, _) = setup(HUB);
    controller
        .update(&snapshot(
            HUB,
            "on",
            json!({
                "current_activity_id": 7,
                "current_activity": "Movie Night",
                "activities": [{"id": 7, "name": "Movie Night", "state": "on"}]
            }),
        ))
        .await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    controller.press_key(Key::Ok.id()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;

    let commands = recorder.hub_commands(HUB);
    assert_eq!(commands[0], tokens(&["type:request_assigned_keys", "activity_id:7"]));
    assert_eq!(
        commands[1],
        tokens(&["type:send_assigned_key", "activity_id:7", "key_id:176"])
    );
    assert_eq!(commands.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_power_off_right_after_start_reaches_hub() {
    let (mut controller, recorder, _) = setup(HUB);
    controller
        .update(&snapshot(HUB, "off", json!({"activities": activities()})))
        .await;

    controller.select_activity("Movie Night").await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    controller
        .update(&snapshot(
            HUB,
            "on",
            json!({"current_activity_id": 7, "current_activity": "Movie Night", "activities": activities()}),
        ))
        .await;

    controller.select_activity("Powered Off").await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    let commands = recorder.hub_commands(HUB);
    assert_eq!(commands[0], tokens(&["type:start_activity", "activity_id:7"]));
    assert!(commands.contains(&tokens(&["type:stop_activity", "activity_id:7"])));
}

#[tokio::test]
async fn test_direct_activity_on_and_off() {
    let (mut controller, recorder, _) = setup(X1S);
    controller
        .update(&snapshot(
            X1S,
            "on",
            json!({"current_activity_id": 5, "current_activity": "Watch TV", "activities": activities()}),
        ))
        .await;

    // Selecting the current activity does nothing
    assert!(controller.select_activity("Watch TV").await.is_err());
    controller.select_activity("Movie Night").await.unwrap();
    controller.select_activity("Powered Off").await.unwrap();

    let calls = recorder.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].service, "turn_on");
    assert_eq!(calls[0].data, json!({"entity_id": X1S, "activity": "Movie Night"}));
    assert_eq!(calls[1].service, "turn_off");
    assert_eq!(calls[1].data, json!({"entity_id": X1S}));
}

// ── Binding ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_detection_runs_once_per_entity() {
    let (mut controller, _, registry) = setup(HUB);
    let off = snapshot(HUB, "off", json!({"activities": activities()}));

    controller.update(&off).await;
    controller.update(&off).await;

    assert_eq!(registry.lookups(), 1);
    assert_eq!(controller.integration(), Integration::Hub);
}

#[tokio::test]
async fn test_failed_detection_falls_back_to_direct() {
    let (mut controller, recorder, registry) = setup("remote.unknown");
    let on = snapshot(
        "remote.unknown",
        "on",
        json!({"current_activity_id": 5, "current_activity": "Watch TV", "activities": activities()}),
    );

    let view = controller.update(&on).await;
    assert_eq!(view.integration, Integration::Direct);

    controller.press_key(Key::Back.id()).await.unwrap();
    assert_eq!(
        recorder.calls()[0].data,
        json!({"entity_id": "remote.unknown", "command": 179, "device": 5})
    );

    // Retried on the next tick
    controller.update(&on).await;
    assert_eq!(registry.lookups(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_entity_change_discards_hub_state() {
    let (mut controller, recorder, registry) = setup(HUB);
    controller.update(&snapshot(HUB, "off", json!({}))).await;
    controller
        .update(&snapshot(
            HUB,
            "on",
            json!({
                "current_activity_id": 7,
                "current_activity": "Movie Night",
                "activities": [{"id": 7, "name": "Movie Night", "state": "on"}],
                "macro_keys": {"7": [{"name": "Popcorn", "command_id": 1}]}
            }),
        ))
        .await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!controller.session().is_pristine());
    let sent_before = recorder.hub_commands(HUB).len();

    controller.set_config(RemoteConfig::for_entity(X1S)).unwrap();

    // Everything hub-scoped is gone before the new entity is even detected
    assert!(controller.session().is_pristine());
    assert_eq!(controller.session().entity_id(), X1S);
    assert!(controller.state().is_none());
    assert_eq!(controller.integration(), Integration::Direct);
    assert_eq!(registry.lookups(), 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(recorder.hub_commands(HUB).len(), sent_before);

    controller
        .update(&snapshot(X1S, "off", json!({"activities": activities()})))
        .await;
    assert_eq!(registry.lookups(), 2);
    assert_eq!(controller.integration(), Integration::Direct);
}
