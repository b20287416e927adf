//! Call session tracker
//!
//! Owns every `CallSession` and serializes event application per call id:
//! each session sits behind its own mutex inside a concurrent map, so
//! provider webhooks arriving out of order or duplicated for the same call
//! are applied one at a time while distinct calls proceed in parallel.
//!
//! A lookup table maps provider-native call identifiers to session ids; the
//! entry is removed once the session is terminal to bound memory. Terminal
//! transitions of outbound sessions are bridged into the lead store.
//!
//! Two safety nets cover dropped webhooks:
//! - a per-session handshake watchdog forces FAILED when the media stream
//!   never arrives
//! - a periodic reconciliation sweep forces FAILED on sessions that have
//!   been in flight longer than the configured maximum

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::watch;
use uuid::Uuid;

use leadline_core::{CallOutcome, CallSession, CallState, ContactAddress};
use leadline_leads::LeadStore;

use crate::events::{translate, ProviderEvent, ProviderKind};
use crate::machine::{self, CallEvent, Transition};
use crate::CallError;

/// Tracker timing policy
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// How long a session may wait for the media-stream handshake
    pub handshake_timeout: Duration,
    /// Sessions in flight longer than this are reconciled to failed
    pub max_in_flight: Duration,
    /// Reconciliation sweep period
    pub reconcile_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(30),
            max_in_flight: Duration::from_secs(1800),
            reconcile_interval: Duration::from_secs(60),
        }
    }
}

/// Tracks call sessions and applies lifecycle events
pub struct CallSessionTracker {
    config: TrackerConfig,
    leads: Arc<LeadStore>,
    sessions: DashMap<Uuid, Arc<Mutex<CallSession>>>,
    by_provider_id: DashMap<String, Uuid>,
}

impl CallSessionTracker {
    pub fn new(config: TrackerConfig, leads: Arc<LeadStore>) -> Self {
        Self {
            config,
            leads,
            sessions: DashMap::new(),
            by_provider_id: DashMap::new(),
        }
    }

    /// Create a session for an outbound call to a lead. Spawns the
    /// handshake watchdog for it.
    pub fn create_outbound(
        self: &Arc<Self>,
        provider: ProviderKind,
        contact: ContactAddress,
        lead_id: Uuid,
    ) -> CallSession {
        let session = CallSession::outbound(provider.as_str(), contact, lead_id);
        self.insert(session)
    }

    /// Create a standalone session for an inbound caller
    pub fn create_inbound(self: &Arc<Self>, provider: ProviderKind, contact: ContactAddress) -> CallSession {
        let session = CallSession::inbound(provider.as_str(), contact);
        self.insert(session)
    }

    fn insert(self: &Arc<Self>, session: CallSession) -> CallSession {
        let snapshot = session.clone();
        self.sessions.insert(session.id, Arc::new(Mutex::new(session)));
        tracing::info!(session_id = %snapshot.id, direction = ?snapshot.direction, "call session created");
        self.spawn_handshake_watchdog(snapshot.id);
        snapshot
    }

    /// Snapshot a session by id
    pub fn get(&self, session_id: Uuid) -> Option<CallSession> {
        self.sessions.get(&session_id).map(|entry| entry.lock().clone())
    }

    /// Snapshot all sessions, newest first
    pub fn list(&self, limit: usize, offset: usize) -> Vec<CallSession> {
        let mut sessions: Vec<CallSession> =
            self.sessions.iter().map(|entry| entry.value().lock().clone()).collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        sessions.into_iter().skip(offset).take(limit).collect()
    }

    /// Resolve a provider-native call identifier to a session id. Returns
    /// `None` for unknown identifiers and for sessions already terminal
    /// (the mapping is pruned on terminal transitions).
    pub fn resolve(&self, provider_call_id: &str) -> Option<Uuid> {
        self.by_provider_id.get(provider_call_id).map(|entry| *entry.value())
    }

    /// Apply one event to one session, serialized per call id. Dropped
    /// events (duplicates, out-of-order, terminal targets) leave the
    /// session untouched and are logged, not errored: webhooks cannot be
    /// meaningfully rejected to their sender.
    pub fn apply_event(&self, session_id: Uuid, event: CallEvent) -> Result<Transition, CallError> {
        let entry = self
            .sessions
            .get(&session_id)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| CallError::NotFound(session_id.to_string()))?;

        let mut session = entry.lock();
        let transition = machine::apply(&mut session, &event);

        match &transition {
            Transition::Applied { from, to } => {
                tracing::info!(%session_id, %from, %to, "call transition");

                if let CallEvent::ProviderAccepted { provider_call_id } = &event {
                    self.by_provider_id.insert(provider_call_id.clone(), session_id);
                }

                if to.is_terminal() {
                    if let Some(provider_call_id) = &session.provider_call_id {
                        self.by_provider_id.remove(provider_call_id);
                    }
                    self.bridge_lead(&session, &event, *to);
                }
            }
            Transition::Dropped { reason } => {
                tracing::warn!(%session_id, reason, "call event dropped");
            }
        }

        Ok(transition)
    }

    /// Translate and apply a raw provider webhook. Unknown event types are
    /// dropped; unknown call identifiers come back as `NotFound` (the HTTP
    /// layer still acks them).
    pub fn apply_provider_event(&self, event: &ProviderEvent) -> Result<Transition, CallError> {
        let session_id = self
            .resolve(&event.provider_call_id)
            .ok_or_else(|| CallError::NotFound(event.provider_call_id.clone()))?;

        match translate(event.provider, &event.event_type) {
            Some(status) => self.apply_event(session_id, CallEvent::ProviderStatus(status)),
            None => {
                tracing::debug!(
                    provider = %event.provider,
                    event_type = %event.event_type,
                    "ignoring provider event with no lifecycle meaning"
                );
                Ok(Transition::Dropped {
                    reason: format!("untranslated event type {}", event.event_type),
                })
            }
        }
    }

    /// Feed an accepted terminal transition back into the lead store
    fn bridge_lead(&self, session: &CallSession, event: &CallEvent, to: CallState) {
        let Some(lead_id) = session.lead_id else {
            return; // inbound sessions are recorded standalone
        };

        match to {
            CallState::Completed => {
                let outcome = match event {
                    CallEvent::PipelineFinished { outcome } => CallOutcome::from(outcome.clone()),
                    _ => CallOutcome {
                        summary: session.summary.clone(),
                        transcript: session.transcript.clone(),
                        ..CallOutcome::default()
                    },
                };
                if let Err(err) = self.leads.complete(lead_id, &outcome) {
                    tracing::error!(%lead_id, %err, "failed to record call outcome");
                }
            }
            CallState::NoAnswer | CallState::Busy => {
                self.leads.mark_no_answer(lead_id);
            }
            CallState::Failed | CallState::Canceled => {
                self.leads.mark_failed(lead_id);
            }
            _ => {}
        }
    }

    fn spawn_handshake_watchdog(self: &Arc<Self>, session_id: Uuid) {
        let tracker = Arc::clone(self);
        let timeout = self.config.handshake_timeout;

        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;

            let stalled = tracker
                .get(session_id)
                .map(|s| !s.state.is_terminal() && s.state.rank() < CallState::InProgress.rank())
                .unwrap_or(false);

            if stalled {
                tracing::warn!(%session_id, "media handshake never arrived, failing session");
                let _ = tracker.apply_event(
                    session_id,
                    CallEvent::ForcedFailure {
                        reason: "media handshake timeout".to_string(),
                    },
                );
            }
        });
    }

    /// Start the periodic reconciliation sweep. Returns a shutdown sender.
    ///
    /// Without a background poller a dropped webhook would strand a session
    /// in a non-terminal state forever; the sweep force-fails anything in
    /// flight longer than `max_in_flight`.
    pub fn start_reconciler(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let tracker = Arc::clone(self);
        let interval = self.config.reconcile_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        tracker.reconcile();
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("reconciliation sweep shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    /// One sweep pass: force-fail sessions in flight past the maximum
    pub fn reconcile(&self) {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.config.max_in_flight).unwrap_or(chrono::Duration::zero());

        let stale: Vec<Uuid> = self
            .sessions
            .iter()
            .filter_map(|entry| {
                let session = entry.value().lock();
                (!session.state.is_terminal() && session.started_at < cutoff).then_some(session.id)
            })
            .collect();

        for session_id in stale {
            tracing::warn!(%session_id, "reconciling stranded session to failed");
            let _ = self.apply_event(
                session_id,
                CallEvent::ForcedFailure {
                    reason: "exceeded maximum in-flight duration".to_string(),
                },
            );
        }
    }

    /// Number of tracked sessions
    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}
