//! Prompt building for the qualification persona
//!
//! Assembles the outbound-facing context: base instructions, a
//! gathered-so-far / still-missing slot summary, and the turn history. The
//! slot summary is what steers replies toward unfilled slots without a
//! fixed question order.

use std::fmt;

use serde::{Deserialize, Serialize};

use leadline_core::{QualificationRecord, Turn, TurnRole};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl From<TurnRole> for Role {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => Role::User,
            TurnRole::Assistant => Role::Assistant,
            TurnRole::System => Role::System,
        }
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Prompt builder for the qualification agent
pub struct PromptBuilder {
    system: String,
    messages: Vec<Message>,
}

impl PromptBuilder {
    /// Start from the persona's base instructions
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            messages: Vec::new(),
        }
    }

    /// Name the contact in the system prompt
    pub fn with_contact_name(mut self, name: &str) -> Self {
        if !name.is_empty() {
            self.system.push_str(&format!("\n\nLead name: {}", name));
        }
        self
    }

    /// Append the gathered / still-missing slot summary
    pub fn with_qualification(mut self, record: &QualificationRecord) -> Self {
        let gathered = record.gathered();
        if !gathered.is_empty() {
            let summary = gathered
                .iter()
                .map(|(k, v)| format!("{}: {}", k, v))
                .collect::<Vec<_>>()
                .join(", ");
            self.system.push_str(&format!("\nInfo gathered so far: {}", summary));
        }

        let missing = record.missing();
        if !missing.is_empty() {
            self.system.push_str(&format!("\nStill need: {}", missing.join(", ")));
        }
        self
    }

    /// Append the conversation history
    pub fn with_history(mut self, turns: &[Turn]) -> Self {
        self.messages.extend(turns.iter().map(|turn| Message {
            role: turn.role.into(),
            content: turn.content.clone(),
        }));
        self
    }

    /// Append the current user message
    pub fn user_message(mut self, content: &str) -> Self {
        self.messages.push(Message::user(content));
        self
    }

    /// Build the final message list, system prompt first
    pub fn build(self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.push(Message::system(self.system));
        messages.extend(self.messages);
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_budget() -> QualificationRecord {
        let schema: Vec<String> = ["budget", "timeline", "area"].into_iter().map(String::from).collect();
        let mut record = QualificationRecord::new(&schema);
        record.fill_if_empty("budget", "2M AED");
        record
    }

    #[test]
    fn test_system_prompt_first() {
        let messages = PromptBuilder::new("Base instructions")
            .user_message("Hi")
            .build();

        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "Base instructions");
        assert_eq!(messages[1].role, Role::User);
    }

    #[test]
    fn test_qualification_summary() {
        let messages = PromptBuilder::new("Base")
            .with_qualification(&record_with_budget())
            .build();

        let system = &messages[0].content;
        assert!(system.contains("budget: 2M AED"));
        assert!(system.contains("Still need"));
        assert!(system.contains("timeline"));
        assert!(!system.contains("Still need: budget"));
    }

    #[test]
    fn test_history_roles_mapped() {
        let turns = vec![Turn::user("hello"), Turn::assistant("hi there")];
        let messages = PromptBuilder::new("Base").with_history(&turns).build();

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[2].role, Role::Assistant);
    }
}
