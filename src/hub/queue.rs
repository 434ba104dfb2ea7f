//! Serialized outbound queue toward the hub bridge.
//!
//! The bridge drops or corrupts commands that arrive in quick succession, so
//! every hub call for one binding goes through a single FIFO drained by at
//! most one task, with a per-entry gap after each call.

use crate::service::{ServiceCall, ServiceCaller};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

/// One queued hub call
#[derive(Clone, Debug, PartialEq)]
pub struct QueueEntry {
    pub tokens: Vec<String>,
    /// Pause after this entry is sent, before the next one
    pub gap: Duration,
}

#[derive(Default)]
struct QueueState {
    entries: VecDeque<QueueEntry>,
    /// A drain task owns the queue (or an immediate send is in flight)
    busy: bool,
    /// Session torn down; nothing more is sent
    closed: bool,
}

#[derive(Clone)]
pub struct CommandQueue {
    state: Arc<Mutex<QueueState>>,
    caller: Arc<dyn ServiceCaller>,
    entity_id: Arc<str>,
}

impl CommandQueue {
    pub fn new(entity_id: &str, caller: Arc<dyn ServiceCaller>) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState::default())),
            caller,
            entity_id: Arc::from(entity_id),
        }
    }

    /// Queue an entry and make sure a drain is running.
    ///
    /// Priority entries go to the head, ahead of anything already waiting.
    pub fn enqueue(&self, entry: QueueEntry, priority: bool) {
        let start_drain = {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            debug!(
                entity_id = %self.entity_id,
                tokens = ?entry.tokens,
                priority = priority,
                queued = state.entries.len(),
                "Queueing hub command"
            );
            if priority {
                state.entries.push_front(entry);
            } else {
                state.entries.push_back(entry);
            }
            !std::mem::replace(&mut state.busy, true)
        };

        if start_drain {
            self.spawn_drain(None);
        }
    }

    /// Send now if the queue is idle, otherwise queue at the head.
    ///
    /// An immediate send still holds the busy flag for the entry's gap, so
    /// traffic submitted right after it waits its turn.
    pub async fn send_or_enqueue(&self, entry: QueueEntry) {
        {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            if state.busy || !state.entries.is_empty() {
                drop(state);
                self.enqueue(entry, true);
                return;
            }
            state.busy = true;
        }

        self.issue(&entry.tokens).await;
        self.spawn_drain(Some(entry.gap));
    }

    /// Stop sending and drop everything still queued
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.busy = false;
        state.entries.clear();
    }

    /// Tokens of the entries still waiting, head first
    pub fn pending(&self) -> Vec<Vec<String>> {
        self.lock().entries.iter().map(|e| e.tokens.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn is_busy(&self) -> bool {
        self.lock().busy
    }

    fn spawn_drain(&self, initial_gap: Option<Duration>) {
        let queue = self.clone();
        tokio::spawn(async move {
            queue.drain(initial_gap).await;
        });
    }

    /// Single-flight drain loop; the caller has already set `busy`.
    async fn drain(&self, initial_gap: Option<Duration>) {
        let mut gap = initial_gap;
        loop {
            if let Some(gap) = gap.take() {
                tokio::time::sleep(gap).await;
            }

            let next = {
                let mut state = self.lock();
                if state.closed {
                    return;
                }
                match state.entries.pop_front() {
                    Some(entry) => entry,
                    None => {
                        state.busy = false;
                        return;
                    }
                }
            };

            self.issue(&next.tokens).await;
            gap = Some(next.gap);
        }
    }

    async fn issue(&self, tokens: &[String]) {
        let call = ServiceCall::remote(
            "send_command",
            json!({
                "entity_id": &*self.entity_id,
                "command": tokens,
            }),
        );
        debug!(entity_id = %self.entity_id, tokens = ?tokens, "Sending hub command");
        if let Err(e) = self.caller.call_service(&call).await {
            warn!(entity_id = %self.entity_id, tokens = ?tokens, error = %e, "Hub command failed");
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
