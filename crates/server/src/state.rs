//! Application state wiring
//!
//! Every component handle is constructed explicitly and injected here; no
//! global singletons. The telephony provider and (optional) speech
//! pipeline come from the caller so tests can substitute their own.

use std::sync::Arc;
use std::time::Duration;

use leadline_config::Settings;
use leadline_conversation::{ConversationEngine, InMemoryConversationStore, QualificationExtractor};
use leadline_core::SpeechPipeline;
use leadline_leads::LeadStore;
use leadline_llm::{ChatApiBackend, LlmConfig};
use leadline_telephony::{CallSessionTracker, TelephonyProvider, TrackerConfig};

use crate::ServerError;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub leads: Arc<LeadStore>,
    pub tracker: Arc<CallSessionTracker>,
    pub engine: Arc<ConversationEngine>,
    pub provider: Arc<dyn TelephonyProvider>,
    pub pipeline: Option<Arc<dyn SpeechPipeline>>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        provider: Arc<dyn TelephonyProvider>,
        pipeline: Option<Arc<dyn SpeechPipeline>>,
    ) -> Result<Self, ServerError> {
        let leads = Arc::new(LeadStore::new());

        let tracker = Arc::new(CallSessionTracker::new(
            TrackerConfig {
                handshake_timeout: Duration::from_secs(settings.telephony.handshake_timeout_seconds),
                max_in_flight: Duration::from_secs(settings.telephony.max_in_flight_seconds),
                reconcile_interval: Duration::from_secs(settings.telephony.reconcile_interval_seconds),
            },
            Arc::clone(&leads),
        ));

        let chat_llm = ChatApiBackend::new(LlmConfig {
            model: settings.llm.chat_model.clone(),
            endpoint: settings.llm.endpoint.clone(),
            api_key: settings.llm.api_key.clone(),
            max_tokens: settings.llm.max_tokens,
            temperature: settings.llm.temperature,
            timeout: Duration::from_secs(settings.llm.timeout_seconds),
        })
        .map_err(|e| ServerError::Configuration(e.to_string()))?;

        // extraction wants deterministic, short, structured output
        let extraction_llm = ChatApiBackend::new(LlmConfig {
            model: settings.llm.extraction_model.clone(),
            endpoint: settings.llm.endpoint.clone(),
            api_key: settings.llm.api_key.clone(),
            max_tokens: 200,
            temperature: 0.0,
            timeout: Duration::from_secs(settings.llm.timeout_seconds),
        })
        .map_err(|e| ServerError::Configuration(e.to_string()))?;

        let extractor = QualificationExtractor::new(
            Arc::new(extraction_llm),
            settings.qualification.slots.clone(),
        );

        let engine = Arc::new(ConversationEngine::new(
            Arc::new(InMemoryConversationStore::new()),
            Arc::new(chat_llm),
            extractor,
            settings.qualification.clone(),
            settings.prompts.clone(),
        ));

        Ok(Self {
            settings: Arc::new(settings),
            leads,
            tracker,
            engine,
            provider,
            pipeline,
        })
    }
}
