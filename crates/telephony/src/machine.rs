//! Call session state machine
//!
//! `apply` is a pure transition function over one session and one event,
//! testable without any network stack. It is order-tolerant: events that
//! would move the lifecycle backwards, duplicates, and anything aimed at a
//! terminal session come back as `Dropped` and leave the session untouched.

use chrono::Utc;

use leadline_core::{CallSession, CallState, PipelineOutcome};

use crate::events::CanonicalStatus;

/// Normalized events consumed by the state machine
#[derive(Debug, Clone)]
pub enum CallEvent {
    /// Provider acknowledged the call request
    ProviderAccepted { provider_call_id: String },
    /// Translated provider status callback
    ProviderStatus(CanonicalStatus),
    /// Media-stream handshake completed
    StreamStarted { stream_id: String },
    /// Speech/LLM pipeline finished (completion or error both land here)
    PipelineFinished { outcome: PipelineOutcome },
    /// Watchdog or reconciliation sweep forcing the session down
    ForcedFailure { reason: String },
}

/// Result of applying one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Applied { from: CallState, to: CallState },
    Dropped { reason: String },
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied { .. })
    }
}

/// Apply one event to a session
pub fn apply(session: &mut CallSession, event: &CallEvent) -> Transition {
    let from = session.state;

    if from.is_terminal() {
        return Transition::Dropped {
            reason: format!("session already terminal ({})", from),
        };
    }

    match event {
        CallEvent::ProviderAccepted { provider_call_id } => {
            if session.provider_call_id.is_some() {
                return Transition::Dropped {
                    reason: "duplicate provider acknowledgement".to_string(),
                };
            }
            session.provider_call_id = Some(provider_call_id.clone());
            advance(session, from, CallState::Initiated)
        }

        CallEvent::ProviderStatus(status) => {
            let to = status.target_state();
            if to.rank() <= from.rank() && !to.is_terminal() {
                return Transition::Dropped {
                    reason: format!("out-of-order status {} while {}", to, from),
                };
            }
            advance(session, from, to)
        }

        CallEvent::StreamStarted { stream_id } => {
            if session.stream_id.is_some() {
                return Transition::Dropped {
                    reason: "duplicate stream handshake".to_string(),
                };
            }
            if !matches!(from, CallState::Initiated | CallState::Ringing | CallState::InProgress) {
                return Transition::Dropped {
                    reason: format!("stream handshake while {}", from),
                };
            }
            session.stream_id = Some(stream_id.clone());
            advance(session, from, CallState::InProgress)
        }

        CallEvent::PipelineFinished { outcome } => {
            session.transcript = outcome.transcript.clone();
            session.summary = outcome.summary.clone();
            advance(session, from, CallState::Completed)
        }

        CallEvent::ForcedFailure { reason } => {
            session.failure_reason = Some(reason.clone());
            advance(session, from, CallState::Failed)
        }
    }
}

fn advance(session: &mut CallSession, from: CallState, to: CallState) -> Transition {
    session.state = to;
    if to.is_terminal() {
        let ended = Utc::now();
        session.ended_at = Some(ended);
        session.duration_seconds = Some((ended - session.started_at).num_seconds().max(0) as u64);
    }
    Transition::Applied { from, to }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadline_core::ContactAddress;
    use uuid::Uuid;

    fn session() -> CallSession {
        CallSession::outbound("twilio", ContactAddress::normalize("+971501234567"), Uuid::new_v4())
    }

    fn accepted(session: &mut CallSession) {
        assert!(apply(session, &CallEvent::ProviderAccepted { provider_call_id: "CA1".to_string() }).is_applied());
    }

    #[test]
    fn test_happy_path() {
        let mut s = session();
        accepted(&mut s);
        assert_eq!(s.state, CallState::Initiated);

        assert!(apply(&mut s, &CallEvent::ProviderStatus(CanonicalStatus::Ringing)).is_applied());
        assert!(apply(&mut s, &CallEvent::StreamStarted { stream_id: "MZ1".to_string() }).is_applied());
        assert_eq!(s.state, CallState::InProgress);
        assert_eq!(s.stream_id.as_deref(), Some("MZ1"));

        assert!(apply(&mut s, &CallEvent::ProviderStatus(CanonicalStatus::Completed)).is_applied());
        assert!(s.ended_at.is_some());
        assert!(s.duration_seconds.is_some());
    }

    #[test]
    fn test_ringing_may_be_skipped() {
        let mut s = session();
        accepted(&mut s);
        assert!(apply(&mut s, &CallEvent::StreamStarted { stream_id: "MZ1".to_string() }).is_applied());
        assert_eq!(s.state, CallState::InProgress);
    }

    #[test]
    fn test_terminal_is_immutable() {
        let mut s = session();
        accepted(&mut s);
        apply(&mut s, &CallEvent::ProviderStatus(CanonicalStatus::Completed));
        let ended_at = s.ended_at;

        for event in [
            CallEvent::ProviderStatus(CanonicalStatus::Ringing),
            CallEvent::ProviderStatus(CanonicalStatus::Completed),
            CallEvent::StreamStarted { stream_id: "MZ9".to_string() },
            CallEvent::ForcedFailure { reason: "sweep".to_string() },
        ] {
            assert!(!apply(&mut s, &event).is_applied());
        }

        assert_eq!(s.state, CallState::Completed);
        assert_eq!(s.ended_at, ended_at);
        assert!(s.stream_id.is_none());
    }

    #[test]
    fn test_duplicate_hangup_is_noop() {
        let mut s = session();
        accepted(&mut s);
        apply(&mut s, &CallEvent::ProviderStatus(CanonicalStatus::InProgress));

        assert!(apply(&mut s, &CallEvent::ProviderStatus(CanonicalStatus::Completed)).is_applied());
        let ended_at = s.ended_at;

        let second = apply(&mut s, &CallEvent::ProviderStatus(CanonicalStatus::Completed));
        assert!(!second.is_applied());
        assert_eq!(s.ended_at, ended_at);
    }

    #[test]
    fn test_out_of_order_status_dropped() {
        let mut s = session();
        accepted(&mut s);
        apply(&mut s, &CallEvent::ProviderStatus(CanonicalStatus::InProgress));

        // late ringing arrives after the call connected
        let transition = apply(&mut s, &CallEvent::ProviderStatus(CanonicalStatus::Ringing));
        assert!(!transition.is_applied());
        assert_eq!(s.state, CallState::InProgress);
    }

    #[test]
    fn test_pipeline_finish_always_completes() {
        let mut s = session();
        accepted(&mut s);
        // no handshake, no answered status; pipeline error path still completes
        let outcome = PipelineOutcome {
            summary: Some("cut short".to_string()),
            ..PipelineOutcome::default()
        };
        assert!(apply(&mut s, &CallEvent::PipelineFinished { outcome }).is_applied());
        assert_eq!(s.state, CallState::Completed);
        assert_eq!(s.summary.as_deref(), Some("cut short"));
    }

    #[test]
    fn test_forced_failure_records_reason() {
        let mut s = session();
        let transition = apply(&mut s, &CallEvent::ForcedFailure { reason: "handshake timeout".to_string() });
        assert!(transition.is_applied());
        assert_eq!(s.state, CallState::Failed);
        assert_eq!(s.failure_reason.as_deref(), Some("handshake timeout"));
        assert!(s.ended_at.is_some());
    }

    #[test]
    fn test_stream_handshake_before_ack_dropped() {
        let mut s = session();
        let transition = apply(&mut s, &CallEvent::StreamStarted { stream_id: "MZ1".to_string() });
        assert!(!transition.is_applied());
        assert_eq!(s.state, CallState::Queued);
    }
}
