//! Call session states and records
//!
//! One `CallSession` spans a single attempt to connect a voice call to a
//! contact, from provider signaling through media transport. The canonical
//! state vocabulary here is provider-agnostic; translation from provider
//! event vocabularies happens in the telephony crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::ContactAddress;

/// Canonical call lifecycle state
///
/// `Queued -> Initiated -> Ringing -> InProgress -> terminal`, where
/// `Initiated` may jump straight to `InProgress` when a provider skips the
/// ringing signal. All five end states are terminal and immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[derive(Default)]
pub enum CallState {
    /// Created locally, not yet acknowledged by the provider
    #[default]
    Queued,
    /// Provider accepted the call request
    Initiated,
    /// Remote side is ringing
    Ringing,
    /// Media stream established, conversation underway
    InProgress,
    /// Call finished normally
    Completed,
    /// Call could not be placed or was aborted by an error
    Failed,
    /// Rang out without an answer
    NoAnswer,
    /// Remote side was busy
    Busy,
    /// Canceled before connecting
    Canceled,
}

impl CallState {
    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallState::Completed
                | CallState::Failed
                | CallState::NoAnswer
                | CallState::Busy
                | CallState::Canceled
        )
    }

    /// Position in the forward lifecycle, used to drop out-of-order events.
    /// Terminal states share the highest rank.
    pub fn rank(&self) -> u8 {
        match self {
            CallState::Queued => 0,
            CallState::Initiated => 1,
            CallState::Ringing => 2,
            CallState::InProgress => 3,
            _ => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::Queued => "queued",
            CallState::Initiated => "initiated",
            CallState::Ringing => "ringing",
            CallState::InProgress => "in-progress",
            CallState::Completed => "completed",
            CallState::Failed => "failed",
            CallState::NoAnswer => "no-answer",
            CallState::Busy => "busy",
            CallState::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for CallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Call direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDirection {
    Outbound,
    Inbound,
}

/// One attempt to connect a voice call to a contact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSession {
    pub id: Uuid,
    /// Provider tag, e.g. "twilio" or "telnyx"
    pub provider: String,
    /// Provider-native call identifier, known once the provider acks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_call_id: Option<String>,
    pub state: CallState,
    pub direction: CallDirection,
    /// Linked lead, absent for inbound callers unknown to the store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<Uuid>,
    pub contact: ContactAddress,
    /// Media stream identifier from the transport handshake
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_id: Option<String>,
    pub started_at: DateTime<Utc>,
    /// Set iff `state` is terminal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl CallSession {
    /// Create a fresh outbound session for a lead
    pub fn outbound(provider: impl Into<String>, contact: ContactAddress, lead_id: Uuid) -> Self {
        Self::new(provider, contact, CallDirection::Outbound, Some(lead_id))
    }

    /// Create a standalone inbound session for an unknown caller
    pub fn inbound(provider: impl Into<String>, contact: ContactAddress) -> Self {
        Self::new(provider, contact, CallDirection::Inbound, None)
    }

    fn new(
        provider: impl Into<String>,
        contact: ContactAddress,
        direction: CallDirection,
        lead_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider: provider.into(),
            provider_call_id: None,
            state: CallState::default(),
            direction,
            lead_id,
            contact,
            stream_id: None,
            started_at: Utc::now(),
            ended_at: None,
            duration_seconds: None,
            transcript: None,
            summary: None,
            failure_reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(CallState::Completed.is_terminal());
        assert!(CallState::Busy.is_terminal());
        assert!(CallState::Canceled.is_terminal());
        assert!(!CallState::Queued.is_terminal());
        assert!(!CallState::InProgress.is_terminal());
    }

    #[test]
    fn test_rank_ordering() {
        assert!(CallState::Queued.rank() < CallState::Initiated.rank());
        assert!(CallState::Initiated.rank() < CallState::Ringing.rank());
        assert!(CallState::Ringing.rank() < CallState::InProgress.rank());
        assert!(CallState::InProgress.rank() < CallState::Completed.rank());
        assert_eq!(CallState::Completed.rank(), CallState::NoAnswer.rank());
    }

    #[test]
    fn test_new_session_defaults() {
        let contact = ContactAddress::normalize("+971501234567");
        let session = CallSession::inbound("twilio", contact);

        assert_eq!(session.state, CallState::Queued);
        assert_eq!(session.direction, CallDirection::Inbound);
        assert!(session.lead_id.is_none());
        assert!(session.ended_at.is_none());
    }
}
