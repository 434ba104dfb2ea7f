// Configuration (panel options, Home Assistant connection, timing)
pub mod config;

// Remote entity state model
pub mod entity;

// Backend service calls
pub mod service;

// Integration detection (direct vs hub)
pub mod integration;

// Hub session: command vocabulary, cache, queue
pub mod hub;

// Snapshot reconciliation
pub mod reconcile;

// Pending activity and loading indicator
pub mod activity;

// Action to backend call translation
pub mod dispatch;

// Custom favorites and dashboard actions
pub mod favorites;

// Controller and view model
pub mod remote;

// Home Assistant REST and WebSocket clients
pub mod hass;

#[cfg(test)]
mod testing;
