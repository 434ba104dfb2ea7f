// Hub integration session: cache, request de-dupe and command queue
// for one bound remote entity.

mod cache;
mod command;
mod queue;

pub use cache::HubCache;
pub use command::HubCommand;
pub use queue::{CommandQueue, QueueEntry};

use crate::config::TimingConfig;
use crate::service::ServiceCaller;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Everything hub-specific that belongs to one entity binding.
///
/// Built when the controller binds to an entity and torn down wholesale
/// (never repaired) when it binds to another one.
pub struct HubSession {
    entity_id: String,
    cache: HubCache,
    requested: HashSet<String>,
    queue: CommandQueue,
    timing: TimingConfig,
}

impl HubSession {
    pub fn new(entity_id: &str, caller: Arc<dyn ServiceCaller>, timing: TimingConfig) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            cache: HubCache::new(),
            requested: HashSet::new(),
            queue: CommandQueue::new(entity_id, caller),
            timing,
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn cache(&self) -> &HubCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut HubCache {
        &mut self.cache
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// Queue a discovery request at the tail.
    ///
    /// Each logical request is sent at most once per session. Returns true if
    /// it was queued by this call.
    pub fn request(&mut self, command: HubCommand) -> bool {
        if let Some(key) = command.request_key(&self.entity_id) {
            if !self.requested.insert(key) {
                return false;
            }
        }
        debug!(entity_id = %self.entity_id, command = ?command, "Requesting hub data");
        self.queue.enqueue(
            QueueEntry {
                tokens: command.tokens(),
                gap: self.timing.request_gap(),
            },
            false,
        );
        true
    }

    pub fn request_basic_data(&mut self) -> bool {
        self.request(HubCommand::RequestBasicData)
    }

    pub fn was_requested(&self, command: &HubCommand) -> bool {
        command
            .request_key(&self.entity_id)
            .is_some_and(|key| self.requested.contains(&key))
    }

    /// Send a user command: immediately when the queue is idle, otherwise
    /// at the head of the queue. Never de-duplicated.
    pub async fn send(&self, command: HubCommand) {
        self.queue
            .send_or_enqueue(QueueEntry {
                tokens: command.tokens(),
                gap: self.timing.command_gap(),
            })
            .await;
    }

    /// Stop all traffic for this session and drop its state
    pub fn shutdown(&mut self) {
        self.queue.close();
        self.requested.clear();
        self.cache = HubCache::new();
    }

    /// True when nothing is cached, requested, queued or draining
    pub fn is_pristine(&self) -> bool {
        self.cache.is_empty()
            && self.requested.is_empty()
            && self.queue.is_empty()
            && !self.queue.is_busy()
    }
}
