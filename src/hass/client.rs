use crate::config::HassConfig;
use crate::entity::RemoteEntitySnapshot;
use crate::service::{ServiceCall, ServiceCaller};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

/// HTTP client for the Home Assistant REST API.
///
/// Authenticates with a long-lived access token.
pub struct HassClient {
    access_token: String,
    http_client: Client,
    base_url: String,
}

impl HassClient {
    pub fn new(config: &HassConfig) -> Result<Self> {
        Self::with_base_url(&config.token, &config.url)
    }

    /// Create a client against an explicit base URL (mock servers in tests)
    pub fn with_base_url(access_token: &str, base_url: &str) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent("sofabaton-remote/0.1")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            access_token: access_token.to_string(),
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the current state of one entity.
    pub async fn fetch_state(&self, entity_id: &str) -> Result<RemoteEntitySnapshot> {
        let url = format!(
            "{}/api/states/{}",
            self.base_url,
            urlencoding::encode(entity_id)
        );
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("Failed to send state request")?;

        check_response_status(&response)?;
        response
            .json::<RemoteEntitySnapshot>()
            .await
            .context("Failed to parse state response")
    }
}

#[async_trait]
impl ServiceCaller for HassClient {
    async fn call_service(&self, call: &ServiceCall) -> Result<()> {
        let url = format!(
            "{}/api/services/{}/{}",
            self.base_url,
            urlencoding::encode(&call.domain),
            urlencoding::encode(&call.service)
        );
        debug!(domain = %call.domain, service = %call.service, "Calling service");
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&call.data)
            .send()
            .await
            .with_context(|| format!("Failed to call {}.{}", call.domain, call.service))?;

        check_response_status(&response)
    }
}

/// Map Home Assistant error statuses to descriptive errors.
fn check_response_status(response: &reqwest::Response) -> Result<()> {
    match response.status() {
        StatusCode::UNAUTHORIZED => Err(anyhow!("Home Assistant auth error: token invalid")),
        StatusCode::NOT_FOUND => Err(anyhow!(
            "Home Assistant: entity or service not found ({})",
            response.url().path()
        )),
        s if !s.is_success() => Err(anyhow!("Home Assistant API error: {}", s)),
        _ => Ok(()),
    }
}
