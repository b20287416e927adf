//! Qualification schema configuration
//!
//! The voice and texting paths read the same schema: which slots exist,
//! which subset counts toward qualification, and how many of that subset
//! must be filled before a lead is considered qualified.

use serde::{Deserialize, Serialize};

/// Slot schema and completion rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualificationConfig {
    /// Every slot the conversation tries to populate
    #[serde(default = "default_slots")]
    pub slots: Vec<String>,
    /// Subset counted toward the qualified determination
    #[serde(default = "default_required")]
    pub required: Vec<String>,
    /// Minimum number of `required` slots that must be filled
    #[serde(default = "default_threshold")]
    pub threshold: usize,
    /// Trailing turns handed to the extractor
    #[serde(default = "default_context_window")]
    pub context_window: usize,
}

fn default_slots() -> Vec<String> {
    ["budget", "timeline", "area", "property_type", "visa_status"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_required() -> Vec<String> {
    ["budget", "timeline", "area", "visa_status"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_threshold() -> usize {
    4
}

fn default_context_window() -> usize {
    10
}

impl Default for QualificationConfig {
    fn default() -> Self {
        Self {
            slots: default_slots(),
            required: default_required(),
            threshold: default_threshold(),
            context_window: default_context_window(),
        }
    }
}

impl QualificationConfig {
    /// Clamp the threshold to the required-subset size so a misconfigured
    /// threshold can never make qualification unreachable.
    pub fn effective_threshold(&self) -> usize {
        self.threshold.min(self.required.len())
    }
}
