//! Conversation engine and qualification extraction
//!
//! Features:
//! - Per-contact message threads with append-only logs
//! - Incremental slot extraction with first-value-wins merging
//! - Monotonic qualified determination (latches, never reverts)
//! - Per-address serialization of all mutations
//! - In-process conversation store default

pub mod engine;
pub mod extractor;
pub mod store;

pub use engine::ConversationEngine;
pub use extractor::QualificationExtractor;
pub use store::InMemoryConversationStore;

use thiserror::Error;

/// Conversation errors
#[derive(Error, Debug)]
pub enum ConversationError {
    #[error("Conversation not found: {0}")]
    NotFound(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<leadline_llm::LlmError> for ConversationError {
    fn from(err: leadline_llm::LlmError) -> Self {
        ConversationError::Llm(err.to_string())
    }
}

impl From<leadline_core::Error> for ConversationError {
    fn from(err: leadline_core::Error) -> Self {
        ConversationError::Store(err.to_string())
    }
}

impl From<ConversationError> for leadline_core::Error {
    fn from(err: ConversationError) -> Self {
        match err {
            ConversationError::NotFound(address) => {
                leadline_core::Error::NotFound(format!("conversation {}", address))
            }
            ConversationError::Llm(msg) | ConversationError::Extraction(msg) => {
                leadline_core::Error::ExternalService(msg)
            }
            ConversationError::Store(msg) => leadline_core::Error::Store(msg),
        }
    }
}
