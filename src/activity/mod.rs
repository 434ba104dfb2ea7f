//! Optimistic activity transitions.
//!
//! The backend takes seconds to confirm an activity switch. The tracker holds
//! the user's pending selection and the loading indicator until the
//! authoritative state catches up, or until their deadlines pass. Deadlines
//! are checked against the `now` handed in on each tick; nothing here spawns
//! timers.

use crate::config::TimingConfig;
use crate::reconcile::{is_powered_off_label, ReconciledState};
use tokio::time::Instant;
use tracing::debug;

/// Activity (or power-off) the user selected but the backend has not confirmed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingIntent {
    pub target: String,
    pub requested_at: Instant,
}

#[derive(Clone, Debug)]
struct ActivityLoad {
    target: String,
    started_at: Instant,
}

pub struct ActivityTracker {
    timing: TimingConfig,
    pending: Option<PendingIntent>,
    load: Option<ActivityLoad>,
    pulse_until: Option<Instant>,
}

impl ActivityTracker {
    pub fn new(timing: TimingConfig) -> Self {
        Self {
            timing,
            pending: None,
            load: None,
            pulse_until: None,
        }
    }

    /// Record a new selection. Supersedes any earlier intent and restarts
    /// the loading deadline.
    pub fn begin(&mut self, target: &str, now: Instant) {
        debug!(target = %target, "Activity change pending");
        self.pending = Some(PendingIntent {
            target: target.to_string(),
            requested_at: now,
        });
        self.load = Some(ActivityLoad {
            target: target.to_string(),
            started_at: now,
        });
    }

    /// Short loading blip after a key press
    pub fn pulse(&mut self, now: Instant) {
        self.pulse_until = Some(now + self.timing.command_pulse());
    }

    /// Settle pending and loading against an authoritative state.
    pub fn reconcile(&mut self, state: &ReconciledState, now: Instant) {
        if !state.available {
            self.stop_loading();
            return;
        }

        let current = state.display_label();
        let settled = self
            .pending
            .as_ref()
            .is_some_and(|p| self.pending_expired(p, now) || p.target == current);
        if settled {
            self.pending = None;
        }

        let reached = self.load.as_ref().is_some_and(|load| {
            (is_powered_off_label(&load.target) && state.powered_off)
                || load.target == state.current_activity
        });
        if reached {
            self.stop_loading();
        }
    }

    /// Unexpired pending intent, if any
    pub fn pending(&self, now: Instant) -> Option<&PendingIntent> {
        self.pending
            .as_ref()
            .filter(|p| !self.pending_expired(p, now))
    }

    /// Value the selector shows: the pending target while it differs from
    /// the current label, the current label otherwise.
    pub fn displayed<'a>(&'a self, current: &'a str, now: Instant) -> &'a str {
        match self.pending(now) {
            Some(p) if p.target != current => &p.target,
            _ => current,
        }
    }

    pub fn activity_loading(&self, now: Instant) -> bool {
        self.load
            .as_ref()
            .is_some_and(|load| now.duration_since(load.started_at) < self.timing.loading_timeout())
    }

    pub fn pulse_active(&self, now: Instant) -> bool {
        self.pulse_until.is_some_and(|until| now < until)
    }

    /// Loading indicator: activity switch in progress or a recent press
    pub fn is_loading(&self, now: Instant) -> bool {
        self.activity_loading(now) || self.pulse_active(now)
    }

    /// Forget everything (entity rebind)
    pub fn reset(&mut self) {
        self.pending = None;
        self.load = None;
        self.pulse_until = None;
    }

    fn stop_loading(&mut self) {
        if self.load.take().is_some() {
            debug!("Activity loading finished");
        }
    }

    fn pending_expired(&self, pending: &PendingIntent, now: Instant) -> bool {
        now.duration_since(pending.requested_at) > self.timing.pending_intent()
    }
}
