//! Trait seams for pluggable backends
//!
//! Implementations live in the component crates; the in-process defaults
//! are used for tests and single-node deployments.

pub mod speech;
pub mod store;

pub use speech::{MediaStreamHandle, PipelineOutcome, SpeechPipeline};
pub use store::{ConversationStore, StoredConversation};
