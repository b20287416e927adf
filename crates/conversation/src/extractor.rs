//! Qualification slot extraction
//!
//! One bounded LLM call per extraction cycle: a trailing window of turns
//! plus the slot schema go in, one value-or-null per slot comes out. The
//! caller owns the merge; this module owns prompt construction and strict
//! parsing of the model output. Anything malformed is an error, never a
//! partial result.

use std::collections::BTreeMap;
use std::sync::Arc;

use leadline_core::Turn;
use leadline_llm::{LlmBackend, Message};

use crate::ConversationError;

/// Extracts qualification slot values from conversation windows
pub struct QualificationExtractor {
    llm: Arc<dyn LlmBackend>,
    slots: Vec<String>,
}

impl QualificationExtractor {
    pub fn new(llm: Arc<dyn LlmBackend>, slots: Vec<String>) -> Self {
        Self { llm, slots }
    }

    /// Run one extraction over the given turns. Returns one entry per
    /// schema slot: `Some(value)` when the conversation established it,
    /// `None` otherwise.
    pub async fn extract(&self, turns: &[Turn]) -> Result<BTreeMap<String, Option<String>>, ConversationError> {
        let messages = vec![
            Message::system(self.instruction()),
            Message::user(Self::render_window(turns)),
        ];

        let value = self.llm.generate_json(&messages).await?;
        self.parse(value)
    }

    fn instruction(&self) -> String {
        format!(
            "Extract real estate qualification data from this conversation. \
             Return ONLY a JSON object with these keys (use null if not \
             mentioned): {}. Values should be short strings summarizing \
             what the lead said.",
            self.slots.join(", ")
        )
    }

    fn render_window(turns: &[Turn]) -> String {
        turns
            .iter()
            .map(|turn| format!("{}: {}", turn.role, turn.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parse the model output into the slot map. Unknown keys are ignored;
    /// a non-object or non-string slot value is malformed.
    fn parse(&self, value: serde_json::Value) -> Result<BTreeMap<String, Option<String>>, ConversationError> {
        let object = value
            .as_object()
            .ok_or_else(|| ConversationError::Extraction("extractor returned a non-object".to_string()))?;

        let mut extracted = BTreeMap::new();
        for slot in &self.slots {
            let entry = match object.get(slot) {
                None | Some(serde_json::Value::Null) => None,
                Some(serde_json::Value::String(s)) if s.trim().is_empty() => None,
                Some(serde_json::Value::String(s)) => Some(s.trim().to_string()),
                Some(other) => {
                    return Err(ConversationError::Extraction(format!(
                        "slot {} has non-string value {}",
                        slot, other
                    )));
                }
            };
            extracted.insert(slot.clone(), entry);
        }
        Ok(extracted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use leadline_llm::{GenerationResult, LlmError};

    struct FixedJson(serde_json::Value);

    #[async_trait]
    impl LlmBackend for FixedJson {
        async fn generate(&self, _messages: &[Message]) -> Result<GenerationResult, LlmError> {
            unreachable!("extractor only uses generate_json")
        }

        async fn generate_json(&self, _messages: &[Message]) -> Result<serde_json::Value, LlmError> {
            Ok(self.0.clone())
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    fn slots() -> Vec<String> {
        ["budget", "timeline", "area"].into_iter().map(String::from).collect()
    }

    #[tokio::test]
    async fn test_extracts_values_and_nulls() {
        let extractor = QualificationExtractor::new(
            Arc::new(FixedJson(serde_json::json!({
                "budget": "500k AED",
                "timeline": null,
                "area": "  ",
                "unrelated": "ignored"
            }))),
            slots(),
        );

        let extracted = extractor.extract(&[Turn::user("My budget is 500k")]).await.unwrap();
        assert_eq!(extracted["budget"].as_deref(), Some("500k AED"));
        assert_eq!(extracted["timeline"], None);
        assert_eq!(extracted["area"], None);
        assert!(!extracted.contains_key("unrelated"));
    }

    #[tokio::test]
    async fn test_non_object_is_malformed() {
        let extractor = QualificationExtractor::new(
            Arc::new(FixedJson(serde_json::json!(["budget"]))),
            slots(),
        );
        let result = extractor.extract(&[Turn::user("hi")]).await;
        assert!(matches!(result, Err(ConversationError::Extraction(_))));
    }

    #[tokio::test]
    async fn test_non_string_slot_is_malformed() {
        let extractor = QualificationExtractor::new(
            Arc::new(FixedJson(serde_json::json!({"budget": 500000}))),
            slots(),
        );
        let result = extractor.extract(&[Turn::user("hi")]).await;
        assert!(matches!(result, Err(ConversationError::Extraction(_))));
    }

    #[test]
    fn test_window_rendering() {
        let window = QualificationExtractor::render_window(&[
            Turn::user("Looking in the Marina"),
            Turn::assistant("Great area! What budget do you have in mind?"),
        ]);
        assert!(window.starts_with("user: Looking in the Marina"));
        assert!(window.contains("assistant: Great area!"));
    }
}
