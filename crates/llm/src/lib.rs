//! LLM completion backends
//!
//! Features:
//! - OpenAI-compatible chat completions over HTTP
//! - Plain-text and JSON-constrained generation
//! - Bounded request timeouts (a timeout is terminal, never auto-retried)
//! - Prompt building for the qualification persona

pub mod backend;
pub mod prompt;

pub use backend::{ChatApiBackend, GenerationResult, LlmBackend, LlmConfig};
pub use prompt::{Message, PromptBuilder, Role};

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for leadline_core::Error {
    fn from(err: LlmError) -> Self {
        leadline_core::Error::ExternalService(err.to_string())
    }
}
