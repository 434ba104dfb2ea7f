// Shared fakes for unit tests

use crate::integration::{EntityRegistry, RegistryEntry};
use crate::service::{ServiceCall, ServiceCaller};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use tokio::time::Instant;

/// Records every service call with the (tokio) time it was made
#[derive(Default)]
pub struct RecordingCaller {
    calls: Mutex<Vec<(Instant, ServiceCall)>>,
}

impl RecordingCaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
    }

    pub fn timed_calls(&self) -> Vec<(Instant, ServiceCall)> {
        self.calls.lock().unwrap().clone()
    }

    /// `command` payloads of hub `send_command` calls, as token lists
    pub fn hub_commands(&self) -> Vec<Vec<String>> {
        self.calls()
            .iter()
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
impl ServiceCaller for RecordingCaller {
    async fn call_service(&self, call: &ServiceCall) -> Result<()> {
        self.calls.lock().unwrap().push((Instant::now(), call.clone()));
        Ok(())
    }
}

/// Registry answering every lookup with one platform (or failing)
pub struct StaticRegistry(pub Option<&'static str>);

#[async_trait]
impl EntityRegistry for StaticRegistry {
    async fn get_entity(&self, entity_id: &str) -> Result<RegistryEntry> {
        match self.0 {
            Some(platform) => Ok(RegistryEntry {
                entity_id: entity_id.to_string(),
                platform: platform.to_string(),
            }),
            None => Err(anyhow!("registry unavailable")),
        }
    }
}

pub fn tokens(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
