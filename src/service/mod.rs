// Backend service invocation capability

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// A single backend service call, e.g. `remote.send_command`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServiceCall {
    pub domain: String,
    pub service: String,
    pub data: Value,
}

impl ServiceCall {
    pub fn new(domain: &str, service: &str, data: Value) -> Self {
        Self {
            domain: domain.to_string(),
            service: service.to_string(),
            data,
        }
    }

    /// `remote.<service>` call
    pub fn remote(service: &str, data: Value) -> Self {
        Self::new("remote", service, data)
    }
}

/// Invokes backend services on behalf of the remote.
///
/// Implemented by the Home Assistant client in production and by
/// recording fakes in tests.
#[async_trait]
pub trait ServiceCaller: Send + Sync {
    async fn call_service(&self, call: &ServiceCall) -> Result<()>;
}
