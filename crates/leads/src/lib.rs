//! Lead management
//!
//! Features:
//! - Batch import with per-row validation
//! - FIFO call queue with lazy tombstone deletion
//! - Atomic dequeue-and-dispatch (no lead handed out twice)
//! - Outcome recording and read projections

pub mod store;

pub use store::{ImportOutcome, LeadStats, LeadStore};

use thiserror::Error;

/// Lead store errors
#[derive(Error, Debug)]
pub enum LeadError {
    #[error("Lead not found: {0}")]
    NotFound(uuid::Uuid),

    #[error("Lead {id} is {status}, expected one of {expected}")]
    InvalidStatus {
        id: uuid::Uuid,
        status: String,
        expected: String,
    },
}

impl From<LeadError> for leadline_core::Error {
    fn from(err: LeadError) -> Self {
        match err {
            LeadError::NotFound(id) => leadline_core::Error::NotFound(format!("lead {}", id)),
            other => leadline_core::Error::InvalidTransition(other.to_string()),
        }
    }
}
