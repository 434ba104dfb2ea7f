use crate::config::HassConfig;
use crate::integration::{EntityRegistry, RegistryEntry};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, Stream, StreamExt};
use serde_json::{json, Value};
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::debug;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Entity registry lookups over the Home Assistant WebSocket API.
///
/// Each lookup opens its own short-lived connection; lookups happen once per
/// entity binding, so there is nothing worth keeping open.
pub struct HassRegistry {
    ws_url: String,
    access_token: String,
    timeout: Duration,
}

impl HassRegistry {
    pub fn new(config: &HassConfig) -> Self {
        Self::with_url(&websocket_url(&config.url), &config.token)
    }

    pub fn with_url(ws_url: &str, access_token: &str) -> Self {
        Self {
            ws_url: ws_url.to_string(),
            access_token: access_token.to_string(),
            timeout: LOOKUP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn lookup(&self, entity_id: &str) -> Result<RegistryEntry> {
        let (mut ws, _) = connect_async(self.ws_url.as_str())
            .await
            .with_context(|| format!("Failed to connect to {}", self.ws_url))?;

        let hello = next_json(&mut ws).await?;
        if hello["type"] != "auth_required" {
            bail!("Unexpected greeting from Home Assistant: {}", hello["type"]);
        }

        let auth = json!({"type": "auth", "access_token": self.access_token});
        ws.send(Message::Text(auth.to_string()))
            .await
            .context("Failed to send auth message")?;
        let reply = next_json(&mut ws).await?;
        if reply["type"] != "auth_ok" {
            bail!(
                "Home Assistant auth failed: {}",
                reply["message"].as_str().unwrap_or("invalid token")
            );
        }

        let request = json!({
            "id": 1,
            "type": "config/entity_registry/get",
            "entity_id": entity_id,
        });
        ws.send(Message::Text(request.to_string()))
            .await
            .context("Failed to send registry request")?;

        let entry = loop {
            let message = next_json(&mut ws).await?;
            if message["id"] != 1 || message["type"] != "result" {
                continue;
            }
            if message["success"] != true {
                bail!(
                    "Registry lookup for {} failed: {}",
                    entity_id,
                    message["error"]["message"].as_str().unwrap_or("unknown error")
                );
            }
            break serde_json::from_value::<RegistryEntry>(message["result"].clone())
                .context("Failed to parse registry entry")?;
        };

        let _ = ws.close(None).await;
        Ok(entry)
    }
}

#[async_trait]
impl EntityRegistry for HassRegistry {
    async fn get_entity(&self, entity_id: &str) -> Result<RegistryEntry> {
        debug!(entity_id = %entity_id, "Looking up entity registry entry");
        tokio::time::timeout(self.timeout, self.lookup(entity_id))
            .await
            .map_err(|_| anyhow!("Registry lookup for {} timed out", entity_id))?
    }
}

/// WebSocket API endpoint for a Home Assistant base URL
pub fn websocket_url(base_url: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!("{}/api/websocket", base)
}

/// Next text frame, parsed as JSON; control frames are skipped.
async fn next_json<S>(ws: &mut S) -> Result<Value>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(message) = ws.next().await {
        match message.context("WebSocket read failed")? {
            Message::Text(text) => {
                return serde_json::from_str(&text).context("Invalid JSON from Home Assistant");
            }
            Message::Close(_) => bail!("Home Assistant closed the connection"),
            _ => continue,
        }
    }
    Err(anyhow!("Home Assistant connection ended"))
}
