//! Telephony integration and call lifecycle tracking
//!
//! Features:
//! - `TelephonyProvider` trait with Twilio and Telnyx REST clients
//! - Per-provider event vocabularies translated into one canonical set
//! - `CallSessionTracker`: an order-tolerant, idempotent state machine
//!   over call sessions, serialized per call id
//! - Handshake watchdog and periodic reconciliation sweep
//!
//! Provider-native vocabulary never leaves this crate; callers above see
//! only canonical states and events.

pub mod events;
pub mod machine;
pub mod provider;
pub mod telnyx;
pub mod tracker;
pub mod twilio;

pub use events::{CanonicalStatus, ProviderEvent, ProviderKind};
pub use machine::{CallEvent, Transition};
pub use provider::{CallbackUrls, TelephonyProvider};
pub use telnyx::{TelnyxConfig, TelnyxProvider};
pub use tracker::{CallSessionTracker, TrackerConfig};
pub use twilio::{stream_twiml, TwilioConfig, TwilioProvider};

use thiserror::Error;

/// Telephony errors
#[derive(Error, Debug)]
pub enum CallError {
    #[error("Call session not found: {0}")]
    NotFound(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider request timed out")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for CallError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CallError::Timeout
        } else {
            CallError::Provider(err.to_string())
        }
    }
}

impl From<CallError> for leadline_core::Error {
    fn from(err: CallError) -> Self {
        match err {
            CallError::NotFound(id) => leadline_core::Error::NotFound(format!("call {}", id)),
            other => leadline_core::Error::ExternalService(other.to_string()),
        }
    }
}
