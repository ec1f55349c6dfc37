//! Character cards.
//!
//! Three card types share one capability trait, [`CardOps`]. Lookups always
//! try user-authored values before type-specific computed values, so a user
//! can shadow any built-in by writing it. Every committed value change is
//! recorded as a [`CardEntryChange`] for the `onCardEntryChange` hooks.

pub mod base;
pub mod coc;
pub mod dnd;
pub mod general;
pub mod linker;
pub mod provider;

pub use base::{CARD_VERSION, CardCore};
pub use coc::CocCard;
pub use dnd::DndCard;
pub use general::GeneralCard;
pub use linker::{CardLink, CardLinker, InMemoryLinker};
pub use provider::CardProvider;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DiceError, DiceResult};

/// The game system a card belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    /// Free-form card.
    General,
    /// Call of Cthulhu.
    Coc,
    /// Dungeons & Dragons 5e.
    Dnd,
}

impl CardType {
    /// Parse a type tag, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "general" => Some(CardType::General),
            "coc" => Some(CardType::Coc),
            "dnd" => Some(CardType::Dnd),
            _ => None,
        }
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardType::General => write!(f, "general"),
            CardType::Coc => write!(f, "coc"),
            CardType::Dnd => write!(f, "dnd"),
        }
    }
}

/// Where an entry's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Core attributes (STR, DEX, ...).
    Props,
    /// User-authored skills.
    Skills,
    /// Resource values (HP, MP, SAN, ...).
    Basic,
    /// Derived or default values.
    Computed,
}

/// COC difficulty prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    /// No prefix.
    #[default]
    Normal,
    /// `困难` / `hard`: half value.
    Hard,
    /// `极难` / `ex`: fifth value.
    Extreme,
}

impl Difficulty {
    /// Divisor applied to the base value.
    pub fn divisor(self) -> i64 {
        match self {
            Difficulty::Normal => 1,
            Difficulty::Hard => 2,
            Difficulty::Extreme => 5,
        }
    }

    /// Split a difficulty prefix off `input`.
    pub fn split(input: &str) -> (Self, &str) {
        const PREFIXES: [(&str, Difficulty); 6] = [
            ("困难", Difficulty::Hard),
            ("极难", Difficulty::Extreme),
            ("极限", Difficulty::Extreme),
            ("hard", Difficulty::Hard),
            ("extreme", Difficulty::Extreme),
            ("ex", Difficulty::Extreme),
        ];
        for (prefix, difficulty) in PREFIXES {
            if input.len() > prefix.len()
                && input.is_char_boundary(prefix.len())
                && input[..prefix.len()].eq_ignore_ascii_case(prefix)
            {
                return (difficulty, &input[prefix.len()..]);
            }
        }
        (Difficulty::Normal, input)
    }
}

/// DND attribute postfixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Postfix {
    /// `调整`: the attribute modifier.
    Modifier,
    /// `豁免`: the saving throw bonus.
    Saving,
}

/// Extra interpretation attached to an entry lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EntryModifier {
    /// Plain lookup.
    #[default]
    None,
    /// COC difficulty.
    Difficulty(Difficulty),
    /// DND postfix.
    Postfix(Postfix),
}

/// A resolved numeric field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Name as the user typed it.
    pub input: String,
    /// Canonical key.
    pub key: String,
    /// Value to test against, after difficulty or postfix.
    pub value: i64,
    /// Raw stored or computed value.
    pub base_value: i64,
    /// Whether the value came from the command instead of the card.
    pub is_temp: bool,
    /// Whether the field cannot be written directly.
    pub readonly: bool,
    /// Source of the value.
    pub kind: EntryKind,
    /// Difficulty or postfix applied.
    pub modifier: EntryModifier,
}

impl Entry {
    fn stored(input: &str, key: &str, value: i64, kind: EntryKind) -> Self {
        Self {
            input: input.to_string(),
            key: key.to_string(),
            value,
            base_value: value,
            is_temp: false,
            readonly: false,
            kind,
            modifier: EntryModifier::None,
        }
    }

    fn computed(input: &str, key: &str, value: i64) -> Self {
        Self {
            readonly: true,
            ..Self::stored(input, key, value, EntryKind::Computed)
        }
    }

    /// A value given inline in a command, e.g. `侦查 50`.
    pub fn temp(input: &str, value: i64, difficulty: Difficulty) -> Self {
        Self {
            input: input.to_string(),
            key: input.to_string(),
            value: value / difficulty.divisor(),
            base_value: value,
            is_temp: true,
            readonly: true,
            kind: EntryKind::Skills,
            modifier: EntryModifier::Difficulty(difficulty),
        }
    }

    fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.value = self.base_value / difficulty.divisor();
        self.modifier = EntryModifier::Difficulty(difficulty);
        self
    }
}

/// A resolved dice-expression macro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    /// Name as the user typed it.
    pub input: String,
    /// Canonical key.
    pub key: String,
    /// Dice expression.
    pub expression: String,
    /// Whether the ability is computed by the card type.
    pub readonly: bool,
}

/// A committed change to a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardEntryChange {
    /// Card that changed.
    pub card_name: String,
    /// Canonical key of the entry, ability or marked skill.
    pub key: String,
    /// What changed.
    pub value: ChangedValue,
}

/// The before and after of a [`CardEntryChange`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangedValue {
    /// A numeric entry.
    Entry {
        /// Value before the change, if it existed.
        old: Option<i64>,
        /// Value after the change.
        new: i64,
    },
    /// An ability expression.
    Ability {
        /// Expression before the change, if the ability existed.
        old: Option<String>,
        /// Expression after the change.
        new: String,
    },
    /// A skill-growth mark.
    GrowthMark {
        /// True when the mark was set, false when it was cleared.
        marked: bool,
    },
}

impl CardEntryChange {
    /// The new numeric value, for entry changes.
    pub fn new_value(&self) -> Option<i64> {
        match self.value {
            ChangedValue::Entry { new, .. } => Some(new),
            _ => None,
        }
    }
}

/// Capabilities shared by every card type.
pub trait CardOps {
    /// Shared state.
    fn core(&self) -> &CardCore;

    /// Shared state, mutably.
    fn core_mut(&mut self) -> &mut CardCore;

    /// The card's game system.
    fn card_type(&self) -> CardType;

    /// Resolve a user-typed name to an entry.
    fn get_entry(&self, input: &str) -> Option<Entry>;

    /// Write an entry, routing through clamped setters where the type has
    /// them. Returns whether the stored value changed.
    fn set_entry(&mut self, input: &str, value: i64) -> bool;

    /// Unique card name.
    fn name(&self) -> &str {
        &self.core().name
    }

    /// Resolve a user-typed name to an ability.
    fn get_ability(&self, input: &str) -> Option<Ability> {
        self.core().ability(input)
    }

    /// Store an ability. Returns whether anything changed.
    fn set_ability(&mut self, input: &str, expression: &str) -> bool {
        self.core_mut().set_ability(input, expression)
    }

    /// Other names that resolve to the same key.
    fn aliases(&self, _key: &str) -> Vec<String> {
        Vec::new()
    }

    /// Human-readable overview of the card.
    fn summary(&self) -> String;
}

/// A card of any type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Card {
    /// Free-form card.
    General(GeneralCard),
    /// Call of Cthulhu card.
    Coc(CocCard),
    /// DND card.
    Dnd(DndCard),
}

impl Card {
    /// An empty card of the given type.
    pub fn new(card_type: CardType, name: impl Into<String>) -> Self {
        match card_type {
            CardType::General => Card::General(GeneralCard::new(name)),
            CardType::Coc => Card::Coc(CocCard::new(name)),
            CardType::Dnd => Card::Dnd(DndCard::new(name)),
        }
    }

    /// Deserialize and migrate a card.
    pub fn from_json(json: &str) -> DiceResult<Self> {
        let mut card: Card = serde_json::from_str(json)?;
        card.migrate()?;
        Ok(card)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> DiceResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Upgrade the payload to [`CARD_VERSION`] in place. Returns whether
    /// anything was upgraded.
    pub fn migrate(&mut self) -> DiceResult<bool> {
        let found = self.core().version;
        if found > CARD_VERSION {
            return Err(DiceError::UnsupportedVersion {
                kind: "card",
                found,
                supported: CARD_VERSION,
            });
        }
        if found == CARD_VERSION {
            return Ok(false);
        }
        match self {
            Card::Coc(card) => card.migrate_from(found),
            Card::Dnd(card) => card.migrate_from(found),
            Card::General(_) => {}
        }
        self.core_mut().version = CARD_VERSION;
        Ok(true)
    }

    /// The COC card, if this is one.
    pub fn as_coc(&self) -> Option<&CocCard> {
        match self {
            Card::Coc(card) => Some(card),
            _ => None,
        }
    }

    /// The COC card, mutably.
    pub fn as_coc_mut(&mut self) -> Option<&mut CocCard> {
        match self {
            Card::Coc(card) => Some(card),
            _ => None,
        }
    }

    /// The DND card, if this is one.
    pub fn as_dnd(&self) -> Option<&DndCard> {
        match self {
            Card::Dnd(card) => Some(card),
            _ => None,
        }
    }

    /// The DND card, mutably.
    pub fn as_dnd_mut(&mut self) -> Option<&mut DndCard> {
        match self {
            Card::Dnd(card) => Some(card),
            _ => None,
        }
    }

    fn ops(&self) -> &dyn CardOps {
        match self {
            Card::General(card) => card,
            Card::Coc(card) => card,
            Card::Dnd(card) => card,
        }
    }

    fn ops_mut(&mut self) -> &mut dyn CardOps {
        match self {
            Card::General(card) => card,
            Card::Coc(card) => card,
            Card::Dnd(card) => card,
        }
    }
}

impl CardOps for Card {
    fn core(&self) -> &CardCore {
        self.ops().core()
    }

    fn core_mut(&mut self) -> &mut CardCore {
        self.ops_mut().core_mut()
    }

    fn card_type(&self) -> CardType {
        self.ops().card_type()
    }

    fn get_entry(&self, input: &str) -> Option<Entry> {
        self.ops().get_entry(input)
    }

    fn set_entry(&mut self, input: &str, value: i64) -> bool {
        self.ops_mut().set_entry(input, value)
    }

    fn get_ability(&self, input: &str) -> Option<Ability> {
        self.ops().get_ability(input)
    }

    fn set_ability(&mut self, input: &str, expression: &str) -> bool {
        self.ops_mut().set_ability(input, expression)
    }

    fn aliases(&self, key: &str) -> Vec<String> {
        self.ops().aliases(key)
    }

    fn summary(&self) -> String {
        self.ops().summary()
    }
}

/// Resolve `input` against a synonym table, ignoring ASCII case.
pub(crate) fn normalize<'a>(table: &[(&'a str, &'a str)], input: &'a str) -> &'a str {
    table
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(input))
        .map(|(_, key)| *key)
        .unwrap_or(input)
}

/// All synonyms in `table` that resolve to `key`.
pub(crate) fn synonyms_of(table: &[(&str, &str)], key: &str) -> Vec<String> {
    table
        .iter()
        .filter(|(_, k)| *k == key)
        .map(|(alias, _)| alias.to_string())
        .collect()
}
