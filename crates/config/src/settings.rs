//! Application settings

use serde::{Deserialize, Serialize};

use crate::prompts::PromptTemplates;
use crate::qualification::QualificationConfig;
use crate::ConfigError;

/// Top-level settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telephony: TelephonyConfig,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub qualification: QualificationConfig,
    #[serde(default)]
    pub prompts: PromptTemplates,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins; empty means same-origin only
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// Telephony provider settings and call lifecycle policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelephonyConfig {
    /// Active provider tag ("twilio" or "telnyx")
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Public base URL the provider calls back into
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Caller id number
    #[serde(default)]
    pub from_number: String,
    /// Twilio account SID
    #[serde(default)]
    pub account_sid: String,
    /// Twilio auth token
    #[serde(default)]
    pub auth_token: String,
    /// Telnyx API key
    #[serde(default)]
    pub api_key: String,
    /// Telnyx call-control connection id
    #[serde(default)]
    pub connection_id: String,
    /// Seconds to wait for the media-stream handshake before the session
    /// is forced to failed
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_seconds: u64,
    /// Sessions still non-terminal after this long are reconciled to failed
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight_seconds: u64,
    /// Reconciliation sweep period
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_seconds: u64,
    /// Timeout for provider REST calls
    #[serde(default = "default_provider_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_provider() -> String {
    "twilio".to_string()
}
fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_handshake_timeout() -> u64 {
    30
}
fn default_max_in_flight() -> u64 {
    1800
}
fn default_reconcile_interval() -> u64 {
    60
}
fn default_provider_timeout() -> u64 {
    15
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            from_number: String::new(),
            account_sid: String::new(),
            auth_token: String::new(),
            api_key: String::new(),
            connection_id: String::new(),
            handshake_timeout_seconds: default_handshake_timeout(),
            max_in_flight_seconds: default_max_in_flight(),
            reconcile_interval_seconds: default_reconcile_interval(),
            request_timeout_seconds: default_provider_timeout(),
        }
    }
}

/// LLM endpoint settings, mapped onto `leadline-llm`'s backend config by
/// the server wiring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_extract_model")]
    pub extraction_model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
}

fn default_chat_model() -> String {
    "gpt-4o".to_string()
}
fn default_extract_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_max_tokens() -> usize {
    300
}
fn default_temperature() -> f32 {
    0.7
}
fn default_llm_timeout() -> u64 {
    30
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            chat_model: default_chat_model(),
            extraction_model: default_extract_model(),
            endpoint: default_endpoint(),
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_seconds: default_llm_timeout(),
        }
    }
}

/// Load settings from `leadline.toml` (optional) overlaid with
/// `LEADLINE_`-prefixed environment variables
/// (e.g. `LEADLINE_SERVER__PORT=9000`).
pub fn load_settings() -> Result<Settings, ConfigError> {
    let config = config::Config::builder()
        .add_source(config::File::with_name("leadline").required(false))
        .add_source(config::Environment::with_prefix("LEADLINE").separator("__"))
        .build()?;

    Ok(config.try_deserialize()?)
}
