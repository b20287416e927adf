//! Provider event translation
//!
//! Each provider reports call progress in its own vocabulary. A small
//! per-provider table translates those into `CanonicalStatus`; the state
//! machine never branches on provider identity. Unknown event types
//! translate to `None` and are dropped by the caller with a log line.

use serde::{Deserialize, Serialize};

use leadline_core::CallState;

/// Supported telephony providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Twilio,
    Telnyx,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Twilio => "twilio",
            ProviderKind::Telnyx => "telnyx",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "twilio" => Some(ProviderKind::Twilio),
            "telnyx" => Some(ProviderKind::Telnyx),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Provider-agnostic call progress signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
    Initiated,
    Ringing,
    InProgress,
    Completed,
    Busy,
    NoAnswer,
    Canceled,
    Failed,
}

impl CanonicalStatus {
    /// Target state this status drives toward
    pub fn target_state(&self) -> CallState {
        match self {
            CanonicalStatus::Initiated => CallState::Initiated,
            CanonicalStatus::Ringing => CallState::Ringing,
            CanonicalStatus::InProgress => CallState::InProgress,
            CanonicalStatus::Completed => CallState::Completed,
            CanonicalStatus::Busy => CallState::Busy,
            CanonicalStatus::NoAnswer => CallState::NoAnswer,
            CanonicalStatus::Canceled => CallState::Canceled,
            CanonicalStatus::Failed => CallState::Failed,
        }
    }
}

/// Raw webhook event as delivered by a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEvent {
    pub provider: ProviderKind,
    /// Provider-native event/status tag
    pub event_type: String,
    /// Provider-native call identifier
    pub provider_call_id: String,
    /// Remaining payload fields, untouched
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Translate a provider-native event tag into the canonical vocabulary.
/// Returns `None` for event types that carry no lifecycle meaning here
/// (media frames, recording notices, unknown extensions).
pub fn translate(provider: ProviderKind, event_type: &str) -> Option<CanonicalStatus> {
    match provider {
        ProviderKind::Twilio => match event_type {
            "initiated" => Some(CanonicalStatus::Initiated),
            "ringing" => Some(CanonicalStatus::Ringing),
            "answered" | "in-progress" => Some(CanonicalStatus::InProgress),
            "completed" => Some(CanonicalStatus::Completed),
            "busy" => Some(CanonicalStatus::Busy),
            "no-answer" => Some(CanonicalStatus::NoAnswer),
            "canceled" => Some(CanonicalStatus::Canceled),
            "failed" => Some(CanonicalStatus::Failed),
            _ => None,
        },
        ProviderKind::Telnyx => match event_type {
            "call.initiated" => Some(CanonicalStatus::Initiated),
            "call.ringing" => Some(CanonicalStatus::Ringing),
            "call.answered" | "call.bridged" => Some(CanonicalStatus::InProgress),
            "call.hangup" => Some(CanonicalStatus::Completed),
            "call.machine.detection.ended" => None,
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twilio_table() {
        assert_eq!(translate(ProviderKind::Twilio, "ringing"), Some(CanonicalStatus::Ringing));
        assert_eq!(translate(ProviderKind::Twilio, "answered"), Some(CanonicalStatus::InProgress));
        assert_eq!(translate(ProviderKind::Twilio, "no-answer"), Some(CanonicalStatus::NoAnswer));
        assert_eq!(translate(ProviderKind::Twilio, "recording-available"), None);
    }

    #[test]
    fn test_telnyx_table() {
        assert_eq!(translate(ProviderKind::Telnyx, "call.answered"), Some(CanonicalStatus::InProgress));
        assert_eq!(translate(ProviderKind::Telnyx, "call.hangup"), Some(CanonicalStatus::Completed));
        assert_eq!(translate(ProviderKind::Telnyx, "call.machine.detection.ended"), None);
    }

    #[test]
    fn test_same_canonical_target_across_providers() {
        let twilio = translate(ProviderKind::Twilio, "answered").unwrap();
        let telnyx = translate(ProviderKind::Telnyx, "call.answered").unwrap();
        assert_eq!(twilio.target_state(), telnyx.target_state());
    }
}
