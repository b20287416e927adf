//! Core traits and types for the lead qualification engine
//!
//! This crate provides foundational types used across all other crates:
//! - Lead records and lifecycle statuses
//! - Call session states and outcomes
//! - Conversation turns and contact addresses
//! - Qualification slot records
//! - Trait seams for pluggable backends (conversation store, speech pipeline)
//! - Error types

pub mod call;
pub mod conversation;
pub mod error;
pub mod lead;
pub mod qualification;
pub mod traits;

pub use call::{CallDirection, CallSession, CallState};
pub use conversation::{ContactAddress, Turn, TurnRole};
pub use error::{Error, Result};
pub use lead::{BookingStatus, CallOutcome, Lead, LeadRow, LeadStatus};
pub use qualification::QualificationRecord;

pub use traits::{ConversationStore, MediaStreamHandle, PipelineOutcome, SpeechPipeline, StoredConversation};
