//! Dungeons & Dragons 5e cards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::base::find_key;
use super::{CardCore, CardOps, CardType, Entry, EntryKind, EntryModifier, Postfix};
use super::{normalize, synonyms_of};

/// The six ability scores.
pub const PROPS: [&str; 6] = ["力量", "敏捷", "体质", "智力", "感知", "魅力"];

/// The eighteen skills and the ability each one keys off.
pub const SKILLS: [(&str, &str); 18] = [
    ("运动", "力量"),
    ("体操", "敏捷"),
    ("巧手", "敏捷"),
    ("隐匿", "敏捷"),
    ("奥秘", "智力"),
    ("历史", "智力"),
    ("调查", "智力"),
    ("自然", "智力"),
    ("宗教", "智力"),
    ("驯兽", "感知"),
    ("洞悉", "感知"),
    ("医药", "感知"),
    ("察觉", "感知"),
    ("求生", "感知"),
    ("欺瞒", "魅力"),
    ("威吓", "魅力"),
    ("表演", "魅力"),
    ("游说", "魅力"),
];

const HP: &str = "生命值";
const MAX_HP: &str = "最大生命值";
const LEVEL: &str = "等级";
const AC: &str = "护甲等级";
const PROFICIENCY: &str = "熟练加值";

const SYNONYMS: &[(&str, &str)] = &[
    ("str", "力量"),
    ("dex", "敏捷"),
    ("con", "体质"),
    ("int", "智力"),
    ("wis", "感知"),
    ("cha", "魅力"),
    ("hp", "生命值"),
    ("maxhp", "最大生命值"),
    ("hpmax", "最大生命值"),
    ("lv", "等级"),
    ("level", "等级"),
    ("ac", "护甲等级"),
    ("athletics", "运动"),
    ("acrobatics", "体操"),
    ("特技", "体操"),
    ("sleight", "巧手"),
    ("妙手", "巧手"),
    ("stealth", "隐匿"),
    ("隐蔽", "隐匿"),
    ("arcana", "奥秘"),
    ("history", "历史"),
    ("investigation", "调查"),
    ("nature", "自然"),
    ("religion", "宗教"),
    ("animal", "驯兽"),
    ("insight", "洞悉"),
    ("medicine", "医药"),
    ("perception", "察觉"),
    ("侦查", "察觉"),
    ("survival", "求生"),
    ("deception", "欺瞒"),
    ("欺骗", "欺瞒"),
    ("intimidation", "威吓"),
    ("恐吓", "威吓"),
    ("performance", "表演"),
    ("persuasion", "游说"),
    ("说服", "游说"),
    ("pb", "熟练加值"),
];

/// Death saving throw counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeathSaving {
    /// Successes so far.
    pub success: u32,
    /// Failures so far.
    pub failure: u32,
}

/// One spell slot level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpellSlot {
    /// Slots left.
    pub value: i64,
    /// Slots available after a long rest.
    pub max: i64,
}

/// DND-specific card state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DndMeta {
    /// Death saving throws in progress.
    #[serde(default)]
    pub death_saving: DeathSaving,
    /// Spell slots keyed by level, `"1"` through `"9"`.
    #[serde(default)]
    pub spell_slots: BTreeMap<String, SpellSlot>,
    /// Abilities with saving throw proficiency.
    #[serde(default)]
    pub saving_proficiency: BTreeSet<String>,
}

/// A DND character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DndCard {
    /// Shared card state.
    #[serde(flatten)]
    pub core: CardCore,
    /// Ability scores.
    #[serde(default)]
    pub props: BTreeMap<String, i64>,
    /// Skill proficiency levels: 0 none, 1 proficient, 2 expertise.
    #[serde(default)]
    pub skills: BTreeMap<String, i64>,
    /// HP, max HP, level and armor class.
    #[serde(default)]
    pub basic: BTreeMap<String, i64>,
    /// Free-form user values.
    #[serde(default)]
    pub items: BTreeMap<String, i64>,
    /// Death saves, spell slots and saving proficiencies.
    #[serde(default)]
    pub meta: DndMeta,
}

/// `floor((score - 10) / 2)`.
pub fn ability_modifier(score: i64) -> i64 {
    (score - 10).div_euclid(2)
}

fn split_postfix(key: &str) -> Option<(&str, Postfix)> {
    if let Some(prop) = key.strip_suffix("调整") {
        return Some((prop, Postfix::Modifier));
    }
    key.strip_suffix("豁免").map(|prop| (prop, Postfix::Saving))
}

fn spell_level(key: &str) -> Option<&str> {
    key.strip_suffix("环")
        .filter(|lv| matches!(*lv, "1" | "2" | "3" | "4" | "5" | "6" | "7" | "8" | "9"))
}

impl DndCard {
    /// An empty character.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: CardCore::new(name),
            props: BTreeMap::new(),
            skills: BTreeMap::new(),
            basic: BTreeMap::new(),
            items: BTreeMap::new(),
            meta: DndMeta::default(),
        }
    }

    /// `2 + (level - 1) / 4`.
    pub fn proficiency_bonus(&self) -> i64 {
        let level = self.basic.get(LEVEL).copied().unwrap_or(1).max(1);
        2 + (level - 1) / 4
    }

    /// Modifier of an ability score, 0 when unset.
    pub fn modifier_of(&self, prop: &str) -> i64 {
        self.props.get(prop).copied().map(ability_modifier).unwrap_or(0)
    }

    /// The ability a skill or score name keys off, if any.
    pub fn governing_prop(input: &str) -> Option<&'static str> {
        let key = normalize(SYNONYMS, input);
        if let Some(prop) = PROPS.iter().find(|p| **p == key) {
            return Some(*prop);
        }
        SKILLS.iter().find(|(s, _)| *s == key).map(|(_, p)| *p)
    }

    /// Current death saving counters.
    pub fn death_saving(&self) -> DeathSaving {
        self.meta.death_saving
    }

    /// Replace the death saving counters.
    pub fn set_death_saving(&mut self, saving: DeathSaving) {
        if self.meta.death_saving != saving {
            self.meta.death_saving = saving;
            self.core.touch();
        }
    }

    fn put(map: &mut BTreeMap<String, i64>, core: &mut CardCore, key: &str, value: i64) -> bool {
        let old = map.insert(key.to_string(), value);
        core.record(key, old, value)
    }

    fn postfix_entry(&self, input: &str, key: &str) -> Option<Entry> {
        let (prop, postfix) = split_postfix(key)?;
        let prop = normalize(SYNONYMS, prop);
        let score = self.props.get(prop).copied()?;
        let modifier = ability_modifier(score);
        let value = match postfix {
            Postfix::Modifier => modifier,
            Postfix::Saving if self.meta.saving_proficiency.contains(prop) => {
                modifier + self.proficiency_bonus()
            }
            Postfix::Saving => modifier,
        };
        Some(Entry {
            modifier: EntryModifier::Postfix(postfix),
            ..Entry::computed(input, key, value)
        })
    }

    fn skill_entry(&self, input: &str, key: &str) -> Option<Entry> {
        let (skill, prop) = SKILLS.iter().find(|(s, _)| *s == key)?;
        let level = self.skills.get(*skill).copied().unwrap_or(0);
        let value = self.modifier_of(prop) + level * self.proficiency_bonus();
        Some(Entry {
            base_value: level,
            ..Entry::stored(input, skill, value, EntryKind::Skills)
        })
    }

    pub(super) fn migrate_from(&mut self, version: u32) {
        if version < 2 {
            // v1 had no death save meta; serde defaults already filled it.
            self.meta.death_saving = DeathSaving::default();
        }
    }
}

impl CardOps for DndCard {
    fn core(&self) -> &CardCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CardCore {
        &mut self.core
    }

    fn card_type(&self) -> CardType {
        CardType::Dnd
    }

    fn get_entry(&self, input: &str) -> Option<Entry> {
        let key = normalize(SYNONYMS, input);
        if let Some((k, v)) = find_key(&self.items, key) {
            return Some(Entry::stored(input, k, *v, EntryKind::Skills));
        }
        if let Some((k, v)) = find_key(&self.props, key) {
            return Some(Entry::stored(input, k, *v, EntryKind::Props));
        }
        if let Some(entry) = self.skill_entry(input, key) {
            return Some(entry);
        }
        if let Some((k, v)) = find_key(&self.basic, key) {
            return Some(Entry::stored(input, k, *v, EntryKind::Basic));
        }
        if let Some(entry) = self.postfix_entry(input, key) {
            return Some(entry);
        }
        if key == PROFICIENCY {
            return Some(Entry::computed(input, key, self.proficiency_bonus()));
        }
        let level = spell_level(key)?;
        let slot = self.meta.spell_slots.get(level)?;
        Some(Entry {
            base_value: slot.max,
            ..Entry::stored(input, key, slot.value, EntryKind::Basic)
        })
    }

    fn set_entry(&mut self, input: &str, value: i64) -> bool {
        let key = normalize(SYNONYMS, input);
        if PROPS.contains(&key) {
            return Self::put(&mut self.props, &mut self.core, key, value);
        }
        if SKILLS.iter().any(|(s, _)| *s == key) {
            return Self::put(&mut self.skills, &mut self.core, key, value.clamp(0, 2));
        }
        if let Some((prop, Postfix::Saving)) = split_postfix(key) {
            let prop = normalize(SYNONYMS, prop);
            if PROPS.contains(&prop) {
                let had = self.meta.saving_proficiency.contains(prop);
                let changed = if value > 0 {
                    self.meta.saving_proficiency.insert(prop.to_string())
                } else {
                    self.meta.saving_proficiency.remove(prop)
                };
                if changed {
                    self.core.record(key, Some(i64::from(had)), i64::from(!had));
                }
                return changed;
            }
        }
        match key {
            HP => {
                let value = match self.basic.get(MAX_HP) {
                    Some(max) => value.clamp(0, (*max).max(0)),
                    None => value.max(0),
                };
                Self::put(&mut self.basic, &mut self.core, HP, value)
            }
            MAX_HP | LEVEL | AC => Self::put(&mut self.basic, &mut self.core, key, value),
            _ => {
                let slot = spell_level(key).and_then(|lv| self.meta.spell_slots.get_mut(lv));
                if let Some(slot) = slot {
                    let clamped = value.clamp(0, slot.max);
                    let old = std::mem::replace(&mut slot.value, clamped);
                    return self.core.record(key, Some(old), clamped);
                }
                let stored = find_key(&self.items, key)
                    .map(|(k, _)| k.clone())
                    .unwrap_or_else(|| key.to_string());
                Self::put(&mut self.items, &mut self.core, &stored, value)
            }
        }
    }

    fn aliases(&self, key: &str) -> Vec<String> {
        synonyms_of(SYNONYMS, normalize(SYNONYMS, key))
    }

    fn summary(&self) -> String {
        let fmt = |map: &BTreeMap<String, i64>| {
            map.iter()
                .map(|(k, v)| format!("{k}:{v}"))
                .collect::<Vec<_>>()
                .join(" ")
        };
        let mut lines = vec![format!("{} (dnd)", self.core.name)];
        if !self.props.is_empty() {
            lines.push(format!("属性: {}", fmt(&self.props)));
        }
        if !self.basic.is_empty() {
            lines.push(format!("状态: {}", fmt(&self.basic)));
        }
        let proficient: BTreeMap<String, i64> = self
            .skills
            .iter()
            .filter(|(_, lv)| **lv > 0)
            .map(|(k, _)| (k.clone(), self.get_entry(k).map(|e| e.value).unwrap_or(0)))
            .collect();
        if !proficient.is_empty() {
            lines.push(format!("熟练技能: {}", fmt(&proficient)));
        }
        if !self.items.is_empty() {
            lines.push(format!("其他: {}", fmt(&self.items)));
        }
        let ds = self.meta.death_saving;
        if ds.success > 0 || ds.failure > 0 {
            lines.push(format!("死亡豁免: 成功 {} 失败 {}", ds.success, ds.failure));
        }
        lines.join("\n")
    }
}
