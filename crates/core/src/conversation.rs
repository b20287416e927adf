//! Conversation turns and contact addresses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized contact address, the conversation key
///
/// Phone numbers are stored in `+`-prefixed form; a `whatsapp:` prefix is
/// preserved so replies go back over the channel they arrived on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactAddress(String);

impl ContactAddress {
    /// Normalize a raw phone/address string into the canonical key
    pub fn normalize(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.starts_with('+') || trimmed.starts_with("whatsapp:") {
            Self(trimmed.to_string())
        } else {
            Self(format!("+{trimmed}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Bare phone number without the channel prefix
    pub fn phone(&self) -> &str {
        self.0.strip_prefix("whatsapp:").unwrap_or(&self.0)
    }

    pub fn is_whatsapp(&self) -> bool {
        self.0.starts_with("whatsapp:")
    }
}

impl std::fmt::Display for ContactAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role in a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// Lead/contact message
    User,
    /// Agent message
    Assistant,
    /// System note (e.g. a synthetic voice-call summary turn)
    System,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
            TurnRole::System => "system",
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single turn in a conversation log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(TurnRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_adds_plus() {
        let addr = ContactAddress::normalize("971501234567");
        assert_eq!(addr.as_str(), "+971501234567");
    }

    #[test]
    fn test_normalize_keeps_existing_prefix() {
        assert_eq!(ContactAddress::normalize(" +14155550100 ").as_str(), "+14155550100");
        let wa = ContactAddress::normalize("whatsapp:+14155550100");
        assert!(wa.is_whatsapp());
        assert_eq!(wa.phone(), "+14155550100");
    }

    #[test]
    fn test_turn_creation() {
        let turn = Turn::user("My budget is 500k");
        assert_eq!(turn.role, TurnRole::User);
        assert_eq!(turn.content, "My budget is 500k");
    }
}
