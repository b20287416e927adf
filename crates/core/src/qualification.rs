//! Qualification slot records
//!
//! A `QualificationRecord` tracks the named slots a conversation aims to
//! populate (budget, timeline, area, ...). Merging is first-value-wins:
//! a non-empty slot is never overwritten, and the derived `qualified` flag
//! only ever latches from false to true.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Named-slot map plus the derived qualification flag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualificationRecord {
    /// Slot name -> value, `None` until established
    pub slots: BTreeMap<String, Option<String>>,
    /// Latches true once enough required slots are filled; never reverts
    pub qualified: bool,
}

impl QualificationRecord {
    /// Create an empty record over the given slot schema
    pub fn new(schema: &[String]) -> Self {
        Self {
            slots: schema.iter().map(|name| (name.clone(), None)).collect(),
            qualified: false,
        }
    }

    /// Fill a slot only if it is currently empty. Returns true when the
    /// value was taken; a filled slot or unknown name leaves the record
    /// unchanged.
    pub fn fill_if_empty(&mut self, name: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        if value.trim().is_empty() {
            return false;
        }
        match self.slots.get_mut(name) {
            Some(slot) if slot.is_none() => {
                *slot = Some(value);
                true
            }
            _ => false,
        }
    }

    /// Merge extractor output: each non-null value fills its slot only if
    /// empty. Returns how many slots were newly filled.
    pub fn merge(&mut self, extracted: &BTreeMap<String, Option<String>>) -> usize {
        let mut filled = 0;
        for (name, value) in extracted {
            if let Some(value) = value {
                if self.fill_if_empty(name, value.clone()) {
                    filled += 1;
                }
            }
        }
        filled
    }

    /// Slot names still awaiting a value
    pub fn missing(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Established slot name/value pairs
    pub fn gathered(&self) -> Vec<(&str, &str)> {
        self.slots
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
            .collect()
    }

    /// True when every slot in the schema has a value
    pub fn is_complete(&self) -> bool {
        self.slots.values().all(|v| v.is_some())
    }

    /// How many of the given slot names are filled
    pub fn filled_of(&self, names: &[String]) -> usize {
        names
            .iter()
            .filter(|n| matches!(self.slots.get(n.as_str()), Some(Some(_))))
            .count()
    }

    /// Latch `qualified` when at least `threshold` of `required` are filled.
    /// Once true it stays true regardless of later inputs.
    pub fn update_qualified(&mut self, required: &[String], threshold: usize) {
        if !self.qualified && self.filled_of(required) >= threshold {
            self.qualified = true;
        }
    }

    /// Latch `qualified` unconditionally (used when nothing is missing)
    pub fn latch_qualified(&mut self) {
        self.qualified = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Vec<String> {
        ["budget", "timeline", "area", "property_type", "visa_status"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_first_value_wins() {
        let mut record = QualificationRecord::new(&schema());

        assert!(record.fill_if_empty("budget", "500k AED"));
        assert!(!record.fill_if_empty("budget", "800k AED"));
        assert_eq!(record.slots["budget"].as_deref(), Some("500k AED"));
    }

    #[test]
    fn test_unknown_slot_ignored() {
        let mut record = QualificationRecord::new(&schema());
        assert!(!record.fill_if_empty("favourite_color", "blue"));
        assert_eq!(record.slots.len(), 5);
    }

    #[test]
    fn test_merge_skips_nulls_and_filled() {
        let mut record = QualificationRecord::new(&schema());
        record.fill_if_empty("area", "Dubai Marina");

        let extracted: BTreeMap<String, Option<String>> = [
            ("budget".to_string(), Some("2M AED".to_string())),
            ("area".to_string(), Some("Downtown".to_string())),
            ("timeline".to_string(), None),
        ]
        .into_iter()
        .collect();

        assert_eq!(record.merge(&extracted), 1);
        assert_eq!(record.slots["area"].as_deref(), Some("Dubai Marina"));
        assert_eq!(record.slots["budget"].as_deref(), Some("2M AED"));
        assert!(record.slots["timeline"].is_none());
    }

    #[test]
    fn test_qualified_latches() {
        let required: Vec<String> = ["budget", "timeline"].into_iter().map(String::from).collect();
        let mut record = QualificationRecord::new(&schema());

        record.update_qualified(&required, 2);
        assert!(!record.qualified);

        record.fill_if_empty("budget", "1M");
        record.fill_if_empty("timeline", "3 months");
        record.update_qualified(&required, 2);
        assert!(record.qualified);

        // no input can revert the latch
        record.update_qualified(&required, 99);
        assert!(record.qualified);
    }

    #[test]
    fn test_missing_and_gathered() {
        let mut record = QualificationRecord::new(&schema());
        record.fill_if_empty("budget", "500k");

        assert_eq!(record.gathered(), vec![("budget", "500k")]);
        assert_eq!(record.missing().len(), 4);
        assert!(!record.is_complete());
    }
}
