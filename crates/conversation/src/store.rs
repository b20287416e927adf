//! In-process conversation store
//!
//! Default `ConversationStore` backend: a concurrent map keyed by contact
//! address. A database-backed store implements the same trait for
//! production.

use async_trait::async_trait;
use dashmap::DashMap;

use leadline_core::{ContactAddress, ConversationStore, Result, StoredConversation};

/// Concurrent in-memory conversation store
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: DashMap<ContactAddress, StoredConversation>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.conversations.len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load(&self, address: &ContactAddress) -> Result<Option<StoredConversation>> {
        Ok(self.conversations.get(address).map(|entry| entry.value().clone()))
    }

    async fn save(&self, conversation: &StoredConversation) -> Result<()> {
        self.conversations
            .insert(conversation.address.clone(), conversation.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ContactAddress>> {
        let mut entries: Vec<(ContactAddress, chrono::DateTime<chrono::Utc>)> = self
            .conversations
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().updated_at))
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(entries.into_iter().map(|(address, _)| address).collect())
    }

    async fn delete(&self, address: &ContactAddress) -> Result<()> {
        self.conversations.remove(address);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadline_core::QualificationRecord;

    fn conversation(address: &str) -> StoredConversation {
        StoredConversation::new(
            ContactAddress::normalize(address),
            "Test",
            QualificationRecord::new(&["budget".to_string()]),
        )
    }

    #[tokio::test]
    async fn test_round_trip() {
        let store = InMemoryConversationStore::new();
        let convo = conversation("+971501234567");

        store.save(&convo).await.unwrap();
        let loaded = store.load(&convo.address).await.unwrap().unwrap();
        assert_eq!(loaded.display_name, "Test");

        store.delete(&convo.address).await.unwrap();
        assert!(store.load(&convo.address).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = InMemoryConversationStore::new();
        let older = conversation("+1");
        store.save(&older).await.unwrap();

        let mut newer = conversation("+2");
        newer.updated_at = older.updated_at + chrono::Duration::seconds(5);
        store.save(&newer).await.unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed[0], newer.address);
        assert_eq!(listed[1], older.address);
    }
}
