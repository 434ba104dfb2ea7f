use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing limits for the hub bridge and the activity indicators.
///
/// The hub drops calls that arrive too close together, so the gaps here are
/// minimums, not targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Gap after a user command (key press, activity start/stop)
    pub command_gap_ms: u64,
    /// Gap after a discovery request (basic data, assigned/macro/favorite keys)
    pub request_gap_ms: u64,
    /// How long an optimistic activity selection is shown without confirmation
    pub pending_intent_secs: u64,
    /// Safety timeout for the activity loading indicator
    pub loading_timeout_secs: u64,
    /// Length of the "command sent" pulse
    pub command_pulse_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            command_gap_ms: 150,
            request_gap_ms: 3000,
            pending_intent_secs: 15,
            loading_timeout_secs: 60,
            command_pulse_ms: 1000,
        }
    }
}

impl TimingConfig {
    /// Build from env vars, falling back to defaults.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Overlay any `SOFABATON_*` env vars onto this config.
    pub fn with_env_overrides(mut self) -> Self {
        let overrides: [(&str, &mut u64); 5] = [
            ("SOFABATON_COMMAND_GAP_MS", &mut self.command_gap_ms),
            ("SOFABATON_REQUEST_GAP_MS", &mut self.request_gap_ms),
            ("SOFABATON_PENDING_INTENT_SECS", &mut self.pending_intent_secs),
            ("SOFABATON_LOADING_TIMEOUT_SECS", &mut self.loading_timeout_secs),
            ("SOFABATON_COMMAND_PULSE_MS", &mut self.command_pulse_ms),
        ];
        for (name, slot) in overrides {
            if let Ok(v) = std::env::var(name) {
                if let Ok(n) = v.trim().parse::<u64>() {
                    *slot = n;
                }
            }
        }
        self
    }

    pub fn command_gap(&self) -> Duration {
        Duration::from_millis(self.command_gap_ms)
    }

    pub fn request_gap(&self) -> Duration {
        Duration::from_millis(self.request_gap_ms)
    }

    pub fn pending_intent(&self) -> Duration {
        Duration::from_secs(self.pending_intent_secs)
    }

    pub fn loading_timeout(&self) -> Duration {
        Duration::from_secs(self.loading_timeout_secs)
    }

    pub fn command_pulse(&self) -> Duration {
        Duration::from_millis(self.command_pulse_ms)
    }
}
