//! Twilio REST client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use leadline_core::ContactAddress;

use crate::events::ProviderKind;
use crate::provider::{CallbackUrls, TelephonyProvider};
use crate::CallError;

const API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Twilio credentials and caller id
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub timeout: Duration,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// Twilio provider over the 2010-04-01 REST API
#[derive(Clone)]
pub struct TwilioProvider {
    client: Client,
    config: TwilioConfig,
}

impl TwilioProvider {
    pub fn new(config: TwilioConfig) -> Result<Self, CallError> {
        if config.account_sid.is_empty() || config.auth_token.is_empty() {
            return Err(CallError::Configuration("missing Twilio credentials".to_string()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CallError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn api_url(&self, resource: &str) -> String {
        format!("{}/Accounts/{}/{}", API_BASE, self.config.account_sid, resource)
    }

    async fn post_form(&self, url: String, form: &[(&str, &str)]) -> Result<reqwest::Response, CallError> {
        let response = self
            .client
            .post(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CallError::Provider(format!("Twilio {}: {}", status, body)));
        }
        Ok(response)
    }

}

/// TwiML that bridges a call into a media stream. Also used by the answer
/// webhook to reply with connect instructions.
pub fn stream_twiml(stream_url: &str) -> String {
    format!(
        r#"<Response><Connect><Stream url="{}"/></Connect><Pause length="600"/></Response>"#,
        stream_url
    )
}

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
}

#[async_trait]
impl TelephonyProvider for TwilioProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Twilio
    }

    async fn create_call(&self, to: &ContactAddress, callbacks: &CallbackUrls) -> Result<String, CallError> {
        let response = self
            .post_form(
                self.api_url("Calls.json"),
                &[
                    ("To", to.phone()),
                    ("From", &self.config.from_number),
                    ("Url", &callbacks.voice_url),
                    ("StatusCallback", &callbacks.status_callback),
                    ("StatusCallbackEvent", "initiated ringing answered completed"),
                ],
            )
            .await?;

        let call: CallResource = response
            .json()
            .await
            .map_err(|e| CallError::Provider(format!("Twilio response: {}", e)))?;

        tracing::info!(to = %to, sid = %call.sid, "outbound call placed");
        Ok(call.sid)
    }

    async fn start_media_stream(&self, provider_call_id: &str, stream_url: &str) -> Result<(), CallError> {
        let twiml = stream_twiml(stream_url);
        self.post_form(
            self.api_url(&format!("Calls/{}.json", provider_call_id)),
            &[("Twiml", twiml.as_str())],
        )
        .await?;
        Ok(())
    }

    async fn hangup(&self, provider_call_id: &str) -> Result<(), CallError> {
        self.post_form(
            self.api_url(&format!("Calls/{}.json", provider_call_id)),
            &[("Status", "completed")],
        )
        .await?;
        tracing::info!(sid = %provider_call_id, "call hung up");
        Ok(())
    }

    async fn send_message(&self, to: &ContactAddress, body: &str) -> Result<(), CallError> {
        // keep the channel: whatsapp recipients need a whatsapp sender
        let from = if to.is_whatsapp() {
            format!("whatsapp:{}", self.config.from_number)
        } else {
            self.config.from_number.clone()
        };

        self.post_form(
            self.api_url("Messages.json"),
            &[("To", to.as_str()), ("From", &from), ("Body", body)],
        )
        .await?;

        tracing::info!(to = %to, "message sent");
        Ok(())
    }
}
