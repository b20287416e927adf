//! Lead store and call queue
//!
//! One mutex guards both the lead table and the FIFO queue, so
//! `dequeue_next` (pop + status write) is a single critical section and no
//! two dispatchers can hand out the same lead. Enqueueing is O(1); stale
//! queue entries (leads whose status changed while waiting) are skipped at
//! dequeue time instead of being removed mid-queue.

use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use leadline_core::{CallOutcome, Lead, LeadRow, LeadStatus};

use crate::LeadError;

/// Result of an import batch
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    /// Leads created, in input order
    pub imported: Vec<Lead>,
    /// Rows rejected for a missing contact field
    pub rejected: usize,
}

/// Read-only queue/status projection
#[derive(Debug, Clone, Serialize)]
pub struct LeadStats {
    pub total: usize,
    /// Queue depth including not-yet-skipped tombstones
    pub queued: usize,
    pub by_status: BTreeMap<String, usize>,
}

#[derive(Default)]
struct Inner {
    leads: HashMap<Uuid, Lead>,
    call_queue: VecDeque<Uuid>,
}

/// In-process lead store and FIFO dispatcher
#[derive(Default)]
pub struct LeadStore {
    inner: Mutex<Inner>,
}

impl LeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Import a batch of rows. Rows without a non-empty phone are rejected;
    /// the rest become pending leads.
    pub fn import(&self, rows: Vec<LeadRow>) -> ImportOutcome {
        let mut inner = self.inner.lock();
        let mut imported = Vec::new();
        let mut rejected = 0;

        for row in rows {
            if row.phone.trim().is_empty() {
                rejected += 1;
                continue;
            }
            let lead = Lead::from_row(row);
            inner.leads.insert(lead.id, lead.clone());
            imported.push(lead);
        }

        tracing::info!(imported = imported.len(), rejected, "lead import finished");
        ImportOutcome { imported, rejected }
    }

    /// Add a lead to the call queue. Legal only from pending, no-answer or
    /// failed; returns false otherwise or when the id is unknown.
    pub fn enqueue(&self, lead_id: Uuid) -> bool {
        let mut inner = self.inner.lock();
        let Some(lead) = inner.leads.get_mut(&lead_id) else {
            return false;
        };
        if !lead.status.is_enqueueable() {
            tracing::debug!(%lead_id, status = %lead.status, "enqueue refused");
            return false;
        }
        lead.status = LeadStatus::Queued;
        inner.call_queue.push_back(lead_id);
        true
    }

    /// Queue every pending lead; returns how many were enqueued
    pub fn enqueue_all_pending(&self) -> usize {
        let mut inner = self.inner.lock();
        let pending: Vec<Uuid> = inner
            .leads
            .values()
            .filter(|l| l.status == LeadStatus::Pending)
            .map(|l| l.id)
            .collect();

        for id in &pending {
            if let Some(lead) = inner.leads.get_mut(id) {
                lead.status = LeadStatus::Queued;
            }
            inner.call_queue.push_back(*id);
        }
        pending.len()
    }

    /// Pop the next dialable lead, marking it in-progress and stamping
    /// `called_at`. Entries whose lead is no longer queued are tombstones
    /// and get skipped. Returns a snapshot of the claimed lead.
    pub fn dequeue_next(&self) -> Option<Lead> {
        let mut inner = self.inner.lock();
        while let Some(lead_id) = inner.call_queue.pop_front() {
            if let Some(lead) = inner.leads.get_mut(&lead_id) {
                if lead.status == LeadStatus::Queued {
                    lead.status = LeadStatus::InProgress;
                    lead.called_at = Some(Utc::now());
                    return Some(lead.clone());
                }
                tracing::debug!(%lead_id, status = %lead.status, "skipping stale queue entry");
            }
        }
        None
    }

    /// Link the lead to its active call session
    pub fn set_call(&self, lead_id: Uuid, call_id: Uuid) -> Result<(), LeadError> {
        let mut inner = self.inner.lock();
        let lead = inner.leads.get_mut(&lead_id).ok_or(LeadError::NotFound(lead_id))?;
        lead.call_id = Some(call_id);
        Ok(())
    }

    /// Record a finished call against the lead
    pub fn complete(&self, lead_id: Uuid, outcome: &CallOutcome) -> Result<(), LeadError> {
        let mut inner = self.inner.lock();
        let lead = inner.leads.get_mut(&lead_id).ok_or(LeadError::NotFound(lead_id))?;

        lead.status = LeadStatus::Completed;
        lead.completed_at = Some(Utc::now());
        lead.qualification_score = outcome.score;
        lead.call_summary = outcome.summary.clone();
        lead.booking_status = outcome.booking;
        lead.callback_time = outcome.callback_time.clone();

        tracing::info!(
            %lead_id,
            score = ?outcome.score,
            booking = ?outcome.booking,
            "lead completed"
        );
        Ok(())
    }

    /// Move a lead to no-answer. The lead leaves the dial rotation until it
    /// is explicitly re-enqueued.
    pub fn mark_no_answer(&self, lead_id: Uuid) -> bool {
        self.mark(lead_id, LeadStatus::NoAnswer)
    }

    /// Move a lead to failed. No automatic retry follows.
    pub fn mark_failed(&self, lead_id: Uuid) -> bool {
        self.mark(lead_id, LeadStatus::Failed)
    }

    fn mark(&self, lead_id: Uuid, status: LeadStatus) -> bool {
        let mut inner = self.inner.lock();
        match inner.leads.get_mut(&lead_id) {
            Some(lead) => {
                lead.status = status;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, lead_id: Uuid) -> Option<Lead> {
        self.inner.lock().leads.get(&lead_id).cloned()
    }

    /// List leads, newest import first
    pub fn list(&self, status: Option<LeadStatus>, limit: usize, offset: usize) -> Vec<Lead> {
        let inner = self.inner.lock();
        let mut leads: Vec<Lead> = inner
            .leads
            .values()
            .filter(|l| status.map_or(true, |s| l.status == s))
            .cloned()
            .collect();
        leads.sort_by(|a, b| b.imported_at.cmp(&a.imported_at));
        leads.into_iter().skip(offset).take(limit).collect()
    }

    pub fn stats(&self) -> LeadStats {
        let inner = self.inner.lock();
        let mut by_status = BTreeMap::new();
        for lead in inner.leads.values() {
            *by_status.entry(lead.status.as_str().to_string()).or_insert(0) += 1;
        }
        LeadStats {
            total: inner.leads.len(),
            queued: inner.call_queue.len(),
            by_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn row(phone: &str) -> LeadRow {
        LeadRow {
            name: "Test Lead".to_string(),
            phone: phone.to_string(),
            ..LeadRow::default()
        }
    }

    #[test]
    fn test_import_rejects_missing_phone() {
        let store = LeadStore::new();
        let outcome = store.import(vec![row("+971501111111"), row("  "), row("+971502222222")]);

        assert_eq!(outcome.imported.len(), 2);
        assert_eq!(outcome.rejected, 1);
        assert!(outcome.imported.iter().all(|l| l.status == LeadStatus::Pending));
    }

    #[test]
    fn test_enqueue_only_from_retryable_states() {
        let store = LeadStore::new();
        let lead = store.import(vec![row("+100")]).imported.remove(0);

        assert!(store.enqueue(lead.id));
        // already queued
        assert!(!store.enqueue(lead.id));
        // unknown id
        assert!(!store.enqueue(Uuid::new_v4()));

        let claimed = store.dequeue_next().unwrap();
        assert_eq!(claimed.id, lead.id);
        // in-progress leads cannot be re-queued
        assert!(!store.enqueue(lead.id));

        store.mark_no_answer(lead.id);
        assert!(store.enqueue(lead.id));
    }

    #[test]
    fn test_dequeue_skips_tombstones() {
        let store = LeadStore::new();
        let outcome = store.import(vec![row("+1"), row("+2")]);
        let (a, b) = (outcome.imported[0].id, outcome.imported[1].id);

        store.enqueue(a);
        store.enqueue(b);
        // a finishes through another path; its queue entry becomes stale
        store.complete(a, &CallOutcome::default()).unwrap();

        let next = store.dequeue_next().unwrap();
        assert_eq!(next.id, b);
        assert_eq!(next.status, LeadStatus::InProgress);
        assert!(next.called_at.is_some());
        assert!(store.dequeue_next().is_none());
    }

    #[test]
    fn test_dequeue_never_hands_out_a_lead_twice() {
        let store = Arc::new(LeadStore::new());
        let rows: Vec<LeadRow> = (0..200).map(|i| row(&format!("+97150{:07}", i))).collect();
        store.import(rows);
        assert_eq!(store.enqueue_all_pending(), 200);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                let mut claimed = Vec::new();
                while let Some(lead) = store.dequeue_next() {
                    claimed.push(lead.id);
                }
                claimed
            }));
        }

        let mut all: Vec<Uuid> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(total, 200);
        assert_eq!(all.len(), 200);
    }

    #[test]
    fn test_complete_records_outcome() {
        let store = LeadStore::new();
        let lead = store.import(vec![row("+1")]).imported.remove(0);
        store.enqueue(lead.id);
        store.dequeue_next().unwrap();

        let outcome = CallOutcome {
            score: Some(8),
            summary: Some("Interested in a 2BR in the Marina".to_string()),
            booking: Some(leadline_core::BookingStatus::Booked),
            ..CallOutcome::default()
        };
        store.complete(lead.id, &outcome).unwrap();

        let lead = store.get(lead.id).unwrap();
        assert_eq!(lead.status, LeadStatus::Completed);
        assert_eq!(lead.qualification_score, Some(8));
        assert!(lead.completed_at.is_some());
    }

    #[test]
    fn test_stats_projection() {
        let store = LeadStore::new();
        store.import(vec![row("+1"), row("+2"), row("+3")]);
        let ids: Vec<Uuid> = store.list(None, 10, 0).iter().map(|l| l.id).collect();
        store.enqueue(ids[0]);

        let stats = store.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.queued, 1);
        assert_eq!(stats.by_status["pending"], 2);
        assert_eq!(stats.by_status["queued"], 1);
    }

    #[test]
    fn test_list_filter_and_paging() {
        let store = LeadStore::new();
        store.import((0..5).map(|i| row(&format!("+{}", i))).collect());

        assert_eq!(store.list(Some(LeadStatus::Pending), 100, 0).len(), 5);
        assert_eq!(store.list(None, 2, 0).len(), 2);
        assert_eq!(store.list(None, 100, 4).len(), 1);
        assert!(store.list(Some(LeadStatus::Completed), 100, 0).is_empty());
    }
}
