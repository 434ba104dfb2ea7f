//! Integration detection.
//!
//! A remote entity is owned either by the hub integration (commands are
//! proxied through a physical bridge) or by the direct integration. The
//! owning platform is looked up once per bound entity through the entity
//! registry and cached until the binding moves to another entity.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};


/// Registry platform of the hub integration
pub const HUB_PLATFORM: &str = "sofabaton_hub";

/// Backend integration variant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Integration {
    Direct,
    Hub,
}

impl Integration {
    /// Anything that is not the hub platform, including an unknown one, is direct.
    pub fn from_platform(platform: Option<&str>) -> Self {
        match platform {
            Some(HUB_PLATFORM) => Integration::Hub,
            _ => Integration::Direct,
        }
    }

    pub fn is_hub(&self) -> bool {
        matches!(self, Integration::Hub)
    }
}

/// Entity registry record (only the fields the remote needs)
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct RegistryEntry {
    pub entity_id: String,
    #[serde(default)]
    pub platform: String,
}

/// Entity registry lookup capability
#[async_trait]
pub trait EntityRegistry: Send + Sync {
    async fn get_entity(&self, entity_id: &str) -> Result<RegistryEntry>;
}

/// Which entity the detector is bound to and what it resolved
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IntegrationBinding {
    pub entity_id: Option<String>,
    /// Resolved platform; `None` until detected or after a failed lookup
    pub domain: Option<String>,
    /// Entity whose lookup is currently in flight
    pub detecting: Option<String>,
}

impl IntegrationBinding {
    fn is_resolved_for(&self, entity_id: &str) -> bool {
        self.entity_id.as_deref() == Some(entity_id)
            && self.domain.as_deref().is_some_and(|d| !d.is_empty())
    }
}

pub struct IntegrationDetector {
    registry: Arc<dyn EntityRegistry>,
    binding: Mutex<IntegrationBinding>,
}

impl IntegrationDetector {
    pub fn new(registry: Arc<dyn EntityRegistry>) -> Self {
        Self {
            registry,
            binding: Mutex::new(IntegrationBinding::default()),
        }
    }

    /// Bind to `entity_id`.
    ///
    /// Returns true when the binding moved to a different entity; the caller
    /// must then discard every piece of hub state tied to the old entity.
    pub fn bind(&self, entity_id: &str) -> bool {
        let mut binding = self.lock();
        if binding.entity_id.as_deref() == Some(entity_id) {
            return false;
        }
        if let Some(old) = &binding.entity_id {
            info!(old = %old, new = %entity_id, "Remote entity changed, resetting binding");
        }
        *binding = IntegrationBinding {
            entity_id: Some(entity_id.to_string()),
            domain: None,
            detecting: None,
        };
        true
    }

    /// Resolve the integration for `entity_id`, looking it up if needed.
    ///
    /// While a lookup for the same entity is in flight, concurrent callers
    /// return the current (unresolved, i.e. direct) answer without issuing
    /// another lookup. A failed lookup resolves to direct and is retried on
    /// the next call.
    pub async fn ensure(&self, entity_id: &str) -> Integration {
        {
            let mut binding = self.lock();
            if binding.entity_id.as_deref() != Some(entity_id) {
                drop(binding);
                self.bind(entity_id);
                binding = self.lock();
            }
            if binding.is_resolved_for(entity_id) {
                return Integration::from_platform(binding.domain.as_deref());
            }
            if binding.detecting.as_deref() == Some(entity_id) {
                return Integration::from_platform(binding.domain.as_deref());
            }
            binding.detecting = Some(entity_id.to_string());
        }

        let result = self.registry.get_entity(entity_id).await;

        let mut binding = self.lock();
        if binding.detecting.as_deref() == Some(entity_id) {
            binding.detecting = None;
        }
        if binding.entity_id.as_deref() != Some(entity_id) {
            // Rebound while the lookup was in flight; the answer is stale.
            return Integration::from_platform(binding.domain.as_deref());
        }

        match result {
            Ok(entry) => {
                info!(entity_id = %entity_id, platform = %entry.platform, "Detected remote integration");
                binding.domain = Some(entry.platform);
            }
            Err(e) => {
                warn!(entity_id = %entity_id, error = %e, "Entity registry lookup failed, assuming direct integration");
                binding.domain = None;
            }
        }
        Integration::from_platform(binding.domain.as_deref())
    }

    /// Current answer without triggering a lookup
    pub fn integration(&self) -> Integration {
        Integration::from_platform(self.lock().domain.as_deref())
    }

    pub fn binding(&self) -> IntegrationBinding {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, IntegrationBinding> {
        // A poisoned binding only means a panic elsewhere; the data is still usable.
        self.binding.lock().unwrap_or_else(|e| e.into_inner())
    }
}
