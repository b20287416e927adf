//! Prompt and message templates
//!
//! Templates use `{name}`-style placeholders substituted at render time.

use serde::{Deserialize, Serialize};

/// Persona prompts and canned messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplates {
    /// Agent display name used in openers
    #[serde(default = "default_agent_name")]
    pub agent_name: String,
    /// Brokerage the agent represents
    #[serde(default = "default_brokerage")]
    pub brokerage: String,
    /// System prompt for the texting persona
    #[serde(default = "default_texting_prompt")]
    pub texting_system: String,
    /// Opening message for outbound texting outreach
    #[serde(default = "default_opener")]
    pub opener: String,
    /// Reply sent when generation fails
    #[serde(default = "default_fallback")]
    pub fallback_reply: String,
}

fn default_agent_name() -> String {
    "Sam".to_string()
}

fn default_brokerage() -> String {
    "Harborline Realty".to_string()
}

fn default_texting_prompt() -> String {
    "You are {agent_name}, a friendly and professional assistant for \
{brokerage}, a Dubai real estate agency.\n\n\
Your job is to qualify leads through natural WhatsApp/SMS conversation. \
Keep messages SHORT — this is texting, not email.\n\n\
Information to gather (one or two at a time, naturally):\n\
1. Budget range (in AED)\n\
2. Timeline — when are they looking to buy or rent?\n\
3. Preferred areas in Dubai\n\
4. Property type (apartment, villa, townhouse, etc.)\n\
5. Visa status (resident, investor visa, tourist, etc.)\n\n\
Guidelines:\n\
- Be warm, concise, and professional.\n\
- Don't ask all questions at once.\n\
- If they mention a topic, acknowledge it before moving on.\n\
- Once you have all info, summarize what they're looking for and offer to \
book a viewing.\n\
- If they're not interested, thank them gracefully.\n\
- Never be pushy. One short paragraph max per message.\n\
- No emojis."
        .to_string()
}

fn default_opener() -> String {
    "Hi {name}, this is {agent_name} from {brokerage}. I saw you were \
looking at properties in {area} — are you still in the market? I'd love to \
help you find the right place."
        .to_string()
}

fn default_fallback() -> String {
    "Thanks for your message! Let me get back to you shortly.".to_string()
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            agent_name: default_agent_name(),
            brokerage: default_brokerage(),
            texting_system: default_texting_prompt(),
            opener: default_opener(),
            fallback_reply: default_fallback(),
        }
    }
}

impl PromptTemplates {
    /// Render the texting system prompt
    pub fn render_system(&self) -> String {
        self.texting_system
            .replace("{agent_name}", &self.agent_name)
            .replace("{brokerage}", &self.brokerage)
    }

    /// Render the outbound opener for a named lead and area
    pub fn render_opener(&self, name: &str, area: &str) -> String {
        self.opener
            .replace("{agent_name}", &self.agent_name)
            .replace("{brokerage}", &self.brokerage)
            .replace("{name}", name)
            .replace("{area}", area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_opener() {
        let templates = PromptTemplates::default();
        let opener = templates.render_opener("Aisha", "Dubai Marina");

        assert!(opener.contains("Aisha"));
        assert!(opener.contains("Dubai Marina"));
        assert!(opener.contains("Sam"));
        assert!(!opener.contains('{'));
    }

    #[test]
    fn test_render_system_substitutes_persona() {
        let templates = PromptTemplates::default();
        let system = templates.render_system();

        assert!(system.contains("Sam"));
        assert!(system.contains("Harborline Realty"));
        assert!(system.contains("Budget range"));
    }
}
