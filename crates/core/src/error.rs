//! Shared error type
//!
//! Component crates define their own thiserror enums and convert into this
//! one at the seams where a single error currency is convenient (traits,
//! the HTTP layer).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input row or request payload
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation referenced an unknown lead/call/conversation
    #[error("Not found: {0}")]
    NotFound(String),

    /// Event for an already-terminal session, or a stale queue entry
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Provider or LLM call failed or timed out
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Store backend failure
    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
