//! Free-form cards for systems without built-in rules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::base::find_key;
use super::{CardCore, CardOps, CardType, Entry, EntryKind};

/// A card holding arbitrary named values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralCard {
    /// Shared card state.
    #[serde(flatten)]
    pub core: CardCore,
    /// Named values.
    #[serde(default)]
    pub skills: BTreeMap<String, i64>,
}

impl GeneralCard {
    /// An empty card.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: CardCore::new(name),
            skills: BTreeMap::new(),
        }
    }
}

impl CardOps for GeneralCard {
    fn core(&self) -> &CardCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CardCore {
        &mut self.core
    }

    fn card_type(&self) -> CardType {
        CardType::General
    }

    fn get_entry(&self, input: &str) -> Option<Entry> {
        let (key, value) = find_key(&self.skills, input)?;
        Some(Entry::stored(input, key, *value, EntryKind::Skills))
    }

    fn set_entry(&mut self, input: &str, value: i64) -> bool {
        let key = find_key(&self.skills, input)
            .map(|(k, _)| k.clone())
            .unwrap_or_else(|| input.to_string());
        let old = self.skills.insert(key.clone(), value);
        self.core.record(&key, old, value)
    }

    fn summary(&self) -> String {
        let values: Vec<String> = self
            .skills
            .iter()
            .map(|(k, v)| format!("{k}:{v}"))
            .collect();
        if values.is_empty() {
            format!("{} (general)", self.core.name)
        } else {
            format!("{} (general)\n{}", self.core.name, values.join(" "))
        }
    }
}
