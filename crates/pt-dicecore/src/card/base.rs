//! State shared by every card type: identity, abilities and change tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Ability, CardEntryChange, ChangedValue};

/// Current card payload version.
pub const CARD_VERSION: u32 = 2;

fn first_version() -> u32 {
    1
}

/// Fields and bookkeeping common to all cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardCore {
    /// Unique card name.
    pub name: String,
    /// Payload version.
    #[serde(default = "first_version")]
    pub version: u32,
    /// Named dice-expression macros.
    #[serde(default)]
    pub abilities: BTreeMap<String, String>,
    /// Time of the last committed change.
    #[serde(default = "Utc::now")]
    pub last_modified: DateTime<Utc>,
    #[serde(skip)]
    changes: Vec<CardEntryChange>,
}

impl CardCore {
    /// Create an empty core at the current version.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: CARD_VERSION,
            abilities: BTreeMap::new(),
            last_modified: Utc::now(),
            changes: Vec::new(),
        }
    }

    /// Bump `last_modified`.
    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }

    /// Record a value change. Returns false, recording nothing, when the
    /// value did not actually change.
    pub fn record(&mut self, key: &str, old: Option<i64>, new: i64) -> bool {
        if old == Some(new) {
            return false;
        }
        self.push_change(key, ChangedValue::Entry { old, new });
        true
    }

    /// Record a growth mark being set or cleared.
    pub fn record_growth(&mut self, key: &str, marked: bool) {
        self.push_change(key, ChangedValue::GrowthMark { marked });
    }

    fn push_change(&mut self, key: &str, value: ChangedValue) {
        self.changes.push(CardEntryChange {
            card_name: self.name.clone(),
            key: key.to_string(),
            value,
        });
        self.touch();
    }

    /// Take all recorded changes.
    pub fn drain_changes(&mut self) -> Vec<CardEntryChange> {
        std::mem::take(&mut self.changes)
    }

    /// Look up a stored ability, ignoring ASCII case.
    pub fn ability(&self, input: &str) -> Option<Ability> {
        let (key, expression) = self
            .abilities
            .get_key_value(input)
            .or_else(|| {
                self.abilities
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(input))
            })?;
        Some(Ability {
            input: input.to_string(),
            key: key.clone(),
            expression: expression.clone(),
            readonly: false,
        })
    }

    /// Store or replace an ability. Returns whether anything changed.
    pub fn set_ability(&mut self, key: &str, expression: &str) -> bool {
        let existing = self
            .abilities
            .keys()
            .find(|k| k.eq_ignore_ascii_case(key))
            .cloned()
            .unwrap_or_else(|| key.to_string());
        if self.abilities.get(&existing).map(String::as_str) == Some(expression) {
            return false;
        }
        let old = self.abilities.insert(existing.clone(), expression.to_string());
        self.push_change(
            &existing,
            ChangedValue::Ability {
                old,
                new: expression.to_string(),
            },
        );
        true
    }
}

/// Case-insensitive lookup in a value map, returning the stored key.
pub(crate) fn find_key<'a, V>(map: &'a BTreeMap<String, V>, key: &str) -> Option<(&'a String, &'a V)> {
    map.get_key_value(key)
        .or_else(|| map.iter().find(|(k, _)| k.eq_ignore_ascii_case(key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_skips_unchanged_values() {
        let mut core = CardCore::new("Maca");
        assert!(!core.record("力量", Some(60), 60));
        assert!(core.record("力量", Some(60), 65));
        let changes = core.drain_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].value, ChangedValue::Entry { old: Some(60), new: 65 });
        assert!(core.drain_changes().is_empty());
    }

    #[test]
    fn abilities_are_case_insensitive() {
        let mut core = CardCore::new("Maca");
        assert!(core.set_ability("Punch", "d3+1"));
        assert!(!core.set_ability("punch", "d3+1"));
        let ability = core.ability("PUNCH").unwrap();
        assert_eq!(ability.key, "Punch");
        assert_eq!(ability.expression, "d3+1");
    }

    #[test]
    fn ability_writes_are_recorded() {
        let mut core = CardCore::new("Maca");
        core.set_ability("徒手", "1d3");
        core.set_ability("徒手", "1d3");
        core.set_ability("徒手", "1d3+db");
        let changes = core.drain_changes();
        assert_eq!(
            changes.iter().map(|c| c.value.clone()).collect::<Vec<_>>(),
            [
                ChangedValue::Ability {
                    old: None,
                    new: "1d3".into()
                },
                ChangedValue::Ability {
                    old: Some("1d3".into()),
                    new: "1d3+db".into()
                },
            ]
        );
        assert!(changes.iter().all(|c| c.card_name == "Maca" && c.key == "徒手"));
    }
}
