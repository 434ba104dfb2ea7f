// Home Assistant backend: REST for state and service calls, WebSocket for
// entity registry lookups.

mod client;
mod registry;

pub use client::HassClient;
pub use registry::{websocket_url, HassRegistry};
