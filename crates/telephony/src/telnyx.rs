//! Telnyx REST client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use leadline_core::ContactAddress;

use crate::events::ProviderKind;
use crate::provider::{CallbackUrls, TelephonyProvider};
use crate::CallError;

const API_BASE: &str = "https://api.telnyx.com/v2";

/// Telnyx credentials and caller id
#[derive(Debug, Clone)]
pub struct TelnyxConfig {
    pub api_key: String,
    /// Call-control connection id
    pub connection_id: String,
    pub from_number: String,
    pub timeout: Duration,
}

impl Default for TelnyxConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            connection_id: String::new(),
            from_number: String::new(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// Telnyx provider over the v2 call-control API
#[derive(Clone)]
pub struct TelnyxProvider {
    client: Client,
    config: TelnyxConfig,
}

impl TelnyxProvider {
    pub fn new(config: TelnyxConfig) -> Result<Self, CallError> {
        if config.api_key.is_empty() {
            return Err(CallError::Configuration("missing Telnyx API key".to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CallError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    async fn post_json(&self, path: &str, body: serde_json::Value) -> Result<reqwest::Response, CallError> {
        let response = self
            .client
            .post(format!("{}{}", API_BASE, path))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CallError::Provider(format!("Telnyx {}: {}", status, text)));
        }
        Ok(response)
    }
}

#[derive(Debug, Deserialize)]
struct CallData {
    call_control_id: String,
}

#[derive(Debug, Deserialize)]
struct CallEnvelope {
    data: CallData,
}

#[async_trait]
impl TelephonyProvider for TelnyxProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Telnyx
    }

    async fn create_call(&self, to: &ContactAddress, callbacks: &CallbackUrls) -> Result<String, CallError> {
        let response = self
            .post_json(
                "/calls",
                json!({
                    "connection_id": self.config.connection_id,
                    "to": to.phone(),
                    "from": self.config.from_number,
                    "webhook_url": callbacks.status_callback,
                }),
            )
            .await?;

        let envelope: CallEnvelope = response
            .json()
            .await
            .map_err(|e| CallError::Provider(format!("Telnyx response: {}", e)))?;

        tracing::info!(to = %to, call_control_id = %envelope.data.call_control_id, "outbound call placed");
        Ok(envelope.data.call_control_id)
    }

    async fn start_media_stream(&self, provider_call_id: &str, stream_url: &str) -> Result<(), CallError> {
        self.post_json(
            &format!("/calls/{}/actions/streaming_start", provider_call_id),
            json!({
                "stream_url": stream_url,
                "stream_track": "both_tracks",
            }),
        )
        .await?;
        Ok(())
    }

    async fn hangup(&self, provider_call_id: &str) -> Result<(), CallError> {
        self.post_json(&format!("/calls/{}/actions/hangup", provider_call_id), json!({}))
            .await?;
        tracing::info!(call_control_id = %provider_call_id, "call hung up");
        Ok(())
    }

    async fn send_message(&self, to: &ContactAddress, body: &str) -> Result<(), CallError> {
        self.post_json(
            "/messages",
            json!({
                "from": self.config.from_number,
                "to": to.phone(),
                "text": body,
            }),
        )
        .await?;
        tracing::info!(to = %to, "message sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        assert!(TelnyxProvider::new(TelnyxConfig::default()).is_err());
    }

    #[test]
    fn test_envelope_parsing() {
        let envelope: CallEnvelope =
            serde_json::from_str(r#"{"data": {"call_control_id": "v3:abc123"}}"#).unwrap();
        assert_eq!(envelope.data.call_control_id, "v3:abc123");
    }
}
