//! Lead records and lifecycle statuses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lead lifecycle status
///
/// Transitions are driven by the store and the call tracker:
/// `Pending -> Queued -> InProgress -> {Completed, NoAnswer, Failed}`,
/// with `NoAnswer` and `Failed` re-enqueueable back to `Queued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[derive(Default)]
pub enum LeadStatus {
    /// Imported, not yet queued for calling
    #[default]
    Pending,
    /// Waiting in the call queue
    Queued,
    /// Handed to the dialer, call underway
    InProgress,
    /// Call finished with a recorded outcome
    Completed,
    /// Nobody picked up (retryable with an explicit re-enqueue)
    NoAnswer,
    /// Call could not be placed or was cut short (retryable)
    Failed,
}

impl LeadStatus {
    /// Statuses from which a lead may be (re-)enqueued
    pub fn is_enqueueable(&self) -> bool {
        matches!(self, LeadStatus::Pending | LeadStatus::NoAnswer | LeadStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Pending => "pending",
            LeadStatus::Queued => "queued",
            LeadStatus::InProgress => "in-progress",
            LeadStatus::Completed => "completed",
            LeadStatus::NoAnswer => "no-answer",
            LeadStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Booking decision recorded from a finished call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Viewing booked
    Booked,
    /// Lead declined a viewing
    Declined,
    /// Asked to be called back later
    Callback,
}

/// One row of an import batch
///
/// Only `phone` is mandatory; a row without it is rejected during import.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadRow {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub notes: String,
}

/// A prospective contact targeted for calling/texting qualification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: String,
    /// Area of interest, seeds the qualification `area` slot
    pub area: String,
    pub notes: String,
    pub status: LeadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualification_score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_status: Option<BookingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_time: Option<String>,
    /// Session id of the most recent call attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<Uuid>,
    pub imported_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub called_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Lead {
    /// Create a pending lead from an import row
    pub fn from_row(row: LeadRow) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: row.name.trim().to_string(),
            phone: row.phone.trim().to_string(),
            email: row.email.trim().to_string(),
            area: row.area.trim().to_string(),
            notes: row.notes.trim().to_string(),
            status: LeadStatus::Pending,
            qualification_score: None,
            call_summary: None,
            booking_status: None,
            callback_time: None,
            call_id: None,
            imported_at: Utc::now(),
            called_at: None,
            completed_at: None,
        }
    }
}

/// Result payload recorded against a lead when a call finishes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking: Option<BookingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_time: Option<String>,
}

impl CallOutcome {
    pub fn with_summary(summary: impl Into<String>) -> Self {
        Self {
            summary: Some(summary.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_enqueueable() {
        assert!(LeadStatus::Pending.is_enqueueable());
        assert!(LeadStatus::NoAnswer.is_enqueueable());
        assert!(LeadStatus::Failed.is_enqueueable());
        assert!(!LeadStatus::Queued.is_enqueueable());
        assert!(!LeadStatus::InProgress.is_enqueueable());
        assert!(!LeadStatus::Completed.is_enqueueable());
    }

    #[test]
    fn test_from_row_trims_fields() {
        let lead = Lead::from_row(LeadRow {
            name: " Aisha Khan ".to_string(),
            phone: " +971501234567 ".to_string(),
            ..LeadRow::default()
        });

        assert_eq!(lead.name, "Aisha Khan");
        assert_eq!(lead.phone, "+971501234567");
        assert_eq!(lead.status, LeadStatus::Pending);
        assert!(lead.called_at.is_none());
    }

    #[test]
    fn test_status_serde_kebab_case() {
        let json = serde_json::to_string(&LeadStatus::NoAnswer).unwrap();
        assert_eq!(json, "\"no-answer\"");
        let back: LeadStatus = serde_json::from_str("\"in-progress\"").unwrap();
        assert_eq!(back, LeadStatus::InProgress);
    }
}
