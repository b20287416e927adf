//! Configuration management for the lead qualification engine
//!
//! Supports loading configuration from:
//! - TOML files
//! - Environment variables (LEADLINE_ prefix)
//!
//! Modules:
//! - `settings` — server, telephony, and LLM endpoint settings
//! - `qualification` — slot schema, required subset, completion threshold
//! - `prompts` — persona prompt and message templates

pub mod prompts;
pub mod qualification;
pub mod settings;

pub use prompts::PromptTemplates;
pub use qualification::QualificationConfig;
pub use settings::{load_settings, LlmSettings, ServerConfig, Settings, TelephonyConfig};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
