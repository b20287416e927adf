//! Conversation engine
//!
//! Owns the per-contact message threads and their qualification records.
//! Every mutation for a given address runs under that address's lock, so
//! two concurrent webhooks for the same contact cannot race the
//! first-value-wins merge or interleave appends.
//!
//! Extraction guards:
//! - an empty log is a no-op and performs no external call
//! - extraction only runs on a complete exchange (an even number of
//!   user/assistant turns; synthetic system turns such as a voice-call
//!   summary do not count toward parity)
//! - when no slot is missing the qualified flag latches without any
//!   external call
//! - extractor failure or malformed output leaves the record untouched

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;

use leadline_config::{PromptTemplates, QualificationConfig};
use leadline_core::{
    ContactAddress, ConversationStore, QualificationRecord, StoredConversation, Turn, TurnRole,
};
use leadline_llm::{LlmBackend, Message, PromptBuilder};

use crate::extractor::QualificationExtractor;
use crate::ConversationError;

/// Drives per-contact qualification conversations
pub struct ConversationEngine {
    store: Arc<dyn ConversationStore>,
    llm: Arc<dyn LlmBackend>,
    extractor: QualificationExtractor,
    qualification: QualificationConfig,
    prompts: PromptTemplates,
    locks: DashMap<ContactAddress, Arc<Mutex<()>>>,
}

impl ConversationEngine {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        llm: Arc<dyn LlmBackend>,
        extractor: QualificationExtractor,
        qualification: QualificationConfig,
        prompts: PromptTemplates,
    ) -> Self {
        Self {
            store,
            llm,
            extractor,
            qualification,
            prompts,
            locks: DashMap::new(),
        }
    }

    fn lock_for(&self, address: &ContactAddress) -> Arc<Mutex<()>> {
        self.locks
            .entry(address.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Return the existing conversation or create one with an empty
    /// qualification record. Hints fill only currently-empty slots.
    pub async fn get_or_create(
        &self,
        address: &ContactAddress,
        display_name: &str,
        hints: &[(String, String)],
    ) -> Result<StoredConversation, ConversationError> {
        let lock = self.lock_for(address);
        let _guard = lock.lock().await;

        let (conversation, changed) = self.load_or_new(address, display_name, hints).await?;
        if changed {
            self.store.save(&conversation).await?;
        }
        Ok(conversation)
    }

    async fn load_or_new(
        &self,
        address: &ContactAddress,
        display_name: &str,
        hints: &[(String, String)],
    ) -> Result<(StoredConversation, bool), ConversationError> {
        let mut changed = false;
        let mut conversation = match self.store.load(address).await? {
            Some(existing) => existing,
            None => {
                changed = true;
                StoredConversation::new(
                    address.clone(),
                    display_name,
                    QualificationRecord::new(&self.qualification.slots),
                )
            }
        };

        if conversation.display_name.is_empty() && !display_name.is_empty() {
            conversation.display_name = display_name.to_string();
            changed = true;
        }

        for (slot, value) in hints {
            if conversation.qualification.fill_if_empty(slot, value.clone()) {
                changed = true;
            }
        }

        Ok((conversation, changed))
    }

    /// Append one entry to the ordered log
    pub async fn append(
        &self,
        address: &ContactAddress,
        role: TurnRole,
        content: impl Into<String>,
    ) -> Result<(), ConversationError> {
        let lock = self.lock_for(address);
        let _guard = lock.lock().await;

        let mut conversation = self.require(address).await?;
        conversation.turns.push(Turn::new(role, content));
        conversation.updated_at = Utc::now();
        self.store.save(&conversation).await?;
        Ok(())
    }

    /// Run one extraction cycle and return the (possibly updated)
    /// qualification record
    pub async fn extract(&self, address: &ContactAddress) -> Result<QualificationRecord, ConversationError> {
        let lock = self.lock_for(address);
        let _guard = lock.lock().await;

        let mut conversation = self.require(address).await?;
        if self.run_extraction(&mut conversation).await {
            conversation.updated_at = Utc::now();
            self.store.save(&conversation).await?;
        }
        Ok(conversation.qualification)
    }

    /// Extraction cycle over a loaded conversation. Returns whether the
    /// record changed. Assumes the address lock is held.
    async fn run_extraction(&self, conversation: &mut StoredConversation) -> bool {
        if conversation.turns.is_empty() {
            return false;
        }

        let dialogue_turns = conversation
            .turns
            .iter()
            .filter(|t| t.role != TurnRole::System)
            .count();
        if dialogue_turns % 2 != 0 {
            tracing::debug!(address = %conversation.address, "mid-exchange, skipping extraction");
            return false;
        }

        let record = &mut conversation.qualification;
        if record.missing().is_empty() {
            if record.qualified {
                return false;
            }
            record.latch_qualified();
            return true;
        }

        let window_start = conversation
            .turns
            .len()
            .saturating_sub(self.qualification.context_window);

        match self.extractor.extract(&conversation.turns[window_start..]).await {
            Ok(extracted) => {
                let filled = record.merge(&extracted);
                let was_qualified = record.qualified;
                record.update_qualified(
                    &self.qualification.required,
                    self.qualification.effective_threshold(),
                );

                if record.qualified && !was_qualified {
                    tracing::info!(address = %conversation.address, "lead qualified");
                }
                filled > 0 || record.qualified != was_qualified
            }
            Err(err) => {
                tracing::warn!(address = %conversation.address, %err, "extraction failed, record unchanged");
                false
            }
        }
    }

    /// Assemble the outbound-facing context: base instructions, the
    /// gathered/missing slot summary, and the full turn history
    pub async fn build_context(&self, address: &ContactAddress) -> Result<Vec<Message>, ConversationError> {
        let conversation = self.require(address).await?;
        Ok(self.context_messages(&conversation))
    }

    fn context_messages(&self, conversation: &StoredConversation) -> Vec<Message> {
        PromptBuilder::new(self.prompts.render_system())
            .with_contact_name(&conversation.display_name)
            .with_qualification(&conversation.qualification)
            .with_history(&conversation.turns)
            .build()
    }

    /// Handle one inbound text: append the user turn, generate a reply
    /// (canned fallback when the LLM call fails), append it, and run an
    /// extraction cycle. Returns the reply to send back.
    pub async fn handle_inbound(
        &self,
        address: &ContactAddress,
        body: &str,
    ) -> Result<String, ConversationError> {
        let lock = self.lock_for(address);
        let _guard = lock.lock().await;

        let (mut conversation, _) = self.load_or_new(address, "", &[]).await?;
        conversation.turns.push(Turn::user(body));

        let messages = self.context_messages(&conversation);
        let reply = match self.llm.generate(&messages).await {
            Ok(result) => result.text.trim().to_string(),
            Err(err) => {
                tracing::warn!(%address, %err, "reply generation failed, using fallback");
                self.prompts.fallback_reply.clone()
            }
        };

        conversation.turns.push(Turn::assistant(reply.clone()));
        self.run_extraction(&mut conversation).await;

        conversation.updated_at = Utc::now();
        self.store.save(&conversation).await?;
        Ok(reply)
    }

    /// Open an outbound texting thread: create/refresh the conversation,
    /// seed the area hint, and return the templated opener (already
    /// appended as an assistant turn).
    pub async fn start_outreach(
        &self,
        address: &ContactAddress,
        display_name: &str,
        area: &str,
    ) -> Result<String, ConversationError> {
        let lock = self.lock_for(address);
        let _guard = lock.lock().await;

        let hints = if area.is_empty() {
            Vec::new()
        } else {
            vec![("area".to_string(), area.to_string())]
        };
        let (mut conversation, _) = self.load_or_new(address, display_name, &hints).await?;

        let name = if conversation.display_name.is_empty() {
            "there"
        } else {
            conversation.display_name.as_str()
        };
        let opener = self.prompts.render_opener(name, area);

        conversation.turns.push(Turn::assistant(opener.clone()));
        conversation.updated_at = Utc::now();
        self.store.save(&conversation).await?;
        Ok(opener)
    }

    /// Record a finished voice call against the thread: one synthetic
    /// system turn carrying the summary, followed by an extraction cycle.
    pub async fn record_call_summary(
        &self,
        address: &ContactAddress,
        display_name: &str,
        summary: &str,
    ) -> Result<(), ConversationError> {
        let lock = self.lock_for(address);
        let _guard = lock.lock().await;

        let (mut conversation, _) = self.load_or_new(address, display_name, &[]).await?;
        conversation
            .turns
            .push(Turn::new(TurnRole::System, format!("[Voice call summary] {}", summary)));

        self.run_extraction(&mut conversation).await;

        conversation.updated_at = Utc::now();
        self.store.save(&conversation).await?;
        Ok(())
    }

    /// Load a conversation, erroring when the address is unknown
    pub async fn get(&self, address: &ContactAddress) -> Result<StoredConversation, ConversationError> {
        self.require(address).await
    }

    /// Every stored address, most recently updated first
    pub async fn list(&self) -> Result<Vec<ContactAddress>, ConversationError> {
        Ok(self.store.list().await?)
    }

    async fn require(&self, address: &ContactAddress) -> Result<StoredConversation, ConversationError> {
        self.store
            .load(address)
            .await?
            .ok_or_else(|| ConversationError::NotFound(address.to_string()))
    }
}
