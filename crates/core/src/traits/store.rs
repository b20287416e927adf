//! Conversation store interface
//!
//! Durable CRUD keyed by contact address. The conversation crate ships an
//! in-process implementation; a database-backed store implements the same
//! trait for production.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::{ContactAddress, Turn};
use crate::qualification::QualificationRecord;
use crate::Result;

/// Persisted shape of one conversation: the ordered message log plus the
/// qualification record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredConversation {
    pub address: ContactAddress,
    pub display_name: String,
    pub turns: Vec<Turn>,
    pub qualification: QualificationRecord,
    pub updated_at: DateTime<Utc>,
}

impl StoredConversation {
    pub fn new(address: ContactAddress, display_name: impl Into<String>, qualification: QualificationRecord) -> Self {
        Self {
            address,
            display_name: display_name.into(),
            turns: Vec::new(),
            qualification,
            updated_at: Utc::now(),
        }
    }
}

/// Conversation persistence backend
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Load a conversation by address
    async fn load(&self, address: &ContactAddress) -> Result<Option<StoredConversation>>;

    /// Persist the full conversation document (upsert)
    async fn save(&self, conversation: &StoredConversation) -> Result<()>;

    /// List every stored address, most recently updated first
    async fn list(&self) -> Result<Vec<ContactAddress>>;

    /// Remove a conversation
    async fn delete(&self, address: &ContactAddress) -> Result<()>;
}
