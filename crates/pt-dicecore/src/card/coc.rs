//! Call of Cthulhu 7e cards.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::base::find_key;
use super::{Ability, CardCore, CardOps, CardType, Difficulty, Entry, EntryKind};
use super::{normalize, synonyms_of};

/// The eight characteristics.
pub const PROPS: [&str; 8] = ["力量", "体质", "体型", "敏捷", "外貌", "智力", "意志", "教育"];

const HP: &str = "生命值";
const MP: &str = "魔法值";
const SAN: &str = "理智";
const LUCK: &str = "幸运";
const CM: &str = "克苏鲁神话";

/// Resource values stored under `basic`.
pub const BASIC: [&str; 4] = [HP, MP, SAN, LUCK];

const SYNONYMS: &[(&str, &str)] = &[
    ("str", "力量"),
    ("con", "体质"),
    ("siz", "体型"),
    ("dex", "敏捷"),
    ("app", "外貌"),
    ("int", "智力"),
    ("灵感", "智力"),
    ("pow", "意志"),
    ("edu", "教育"),
    ("知识", "教育"),
    ("luck", "幸运"),
    ("运气", "幸运"),
    ("hp", "生命值"),
    ("体力", "生命值"),
    ("mp", "魔法值"),
    ("san", "理智"),
    ("san值", "理智"),
    ("理智值", "理智"),
    ("sanity", "理智"),
    ("cm", "克苏鲁神话"),
    ("克苏鲁", "克苏鲁神话"),
    ("侦察", "侦查"),
    ("图书馆", "图书馆使用"),
    ("计算机", "计算机使用"),
    ("电脑", "计算机使用"),
    ("信用", "信用评级"),
    ("信誉", "信用评级"),
    ("驾驶", "汽车驾驶"),
    ("开车", "汽车驾驶"),
    ("听", "聆听"),
    ("db", "伤害加值"),
    ("build", "体格"),
    ("mov", "移动力"),
    ("hpmax", "最大生命值"),
    ("mpmax", "最大魔法值"),
];

/// Skill bases that do not depend on characteristics.
const SKILL_BASES: &[(&str, i64)] = &[
    ("会计", 5),
    ("人类学", 1),
    ("估价", 5),
    ("考古学", 1),
    ("魅惑", 15),
    ("攀爬", 20),
    ("计算机使用", 5),
    ("信用评级", 0),
    ("克苏鲁神话", 0),
    ("乔装", 5),
    ("汽车驾驶", 20),
    ("电气维修", 10),
    ("电子学", 1),
    ("话术", 5),
    ("斗殴", 25),
    ("手枪", 20),
    ("急救", 30),
    ("历史", 5),
    ("恐吓", 15),
    ("跳跃", 20),
    ("法律", 5),
    ("图书馆使用", 20),
    ("聆听", 20),
    ("锁匠", 1),
    ("机械维修", 10),
    ("医学", 1),
    ("博物学", 10),
    ("领航", 10),
    ("神秘学", 5),
    ("操作重型机械", 1),
    ("说服", 10),
    ("精神分析", 1),
    ("心理学", 10),
    ("骑术", 5),
    ("妙手", 10),
    ("侦查", 25),
    ("潜行", 20),
    ("游泳", 20),
    ("投掷", 20),
    ("追踪", 10),
];

/// COC-specific card state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CocMeta {
    /// Skills marked for a growth check.
    #[serde(default)]
    pub skill_growth: BTreeSet<String>,
}

/// A Call of Cthulhu investigator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocCard {
    /// Shared card state.
    #[serde(flatten)]
    pub core: CardCore,
    /// Characteristics.
    #[serde(default)]
    pub props: BTreeMap<String, i64>,
    /// HP, MP, SAN and luck.
    #[serde(default)]
    pub basic: BTreeMap<String, i64>,
    /// User-authored skills.
    #[serde(default)]
    pub skills: BTreeMap<String, i64>,
    /// Growth marks.
    #[serde(default)]
    pub meta: CocMeta,
}

impl CocCard {
    /// An empty investigator.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            core: CardCore::new(name),
            props: BTreeMap::new(),
            basic: BTreeMap::new(),
            skills: BTreeMap::new(),
            meta: CocMeta::default(),
        }
    }

    fn prop(&self, key: &str) -> Option<i64> {
        self.props.get(key).copied()
    }

    /// `(体质 + 体型) / 10`.
    pub fn max_hp(&self) -> Option<i64> {
        Some((self.prop("体质")? + self.prop("体型")?) / 10)
    }

    /// `意志 / 5`.
    pub fn max_mp(&self) -> Option<i64> {
        Some(self.prop("意志")? / 5)
    }

    /// `99 - 克苏鲁神话`.
    pub fn max_san(&self) -> i64 {
        99 - self.skills.get(CM).copied().unwrap_or(0)
    }

    fn str_siz(&self) -> Option<i64> {
        match (self.prop("力量"), self.prop("体型")) {
            (None, None) => None,
            (str_, siz) => Some(str_.unwrap_or(0) + siz.unwrap_or(0)),
        }
    }

    /// Build and damage bonus from `力量 + 体型`.
    fn build_and_db(&self) -> Option<(i64, String)> {
        let sum = self.str_siz()?;
        Some(match sum {
            ..=64 => (-2, "-2".to_string()),
            65..=84 => (-1, "-1".to_string()),
            85..=124 => (0, "0".to_string()),
            125..=164 => (1, "1d4".to_string()),
            165..=204 => (2, "1d6".to_string()),
            _ => {
                let extra = (sum - 205) / 80 + 1;
                (2 + extra, format!("{}d6", extra + 1))
            }
        })
    }

    fn movement(&self) -> Option<i64> {
        let (str_, dex, siz) = (self.prop("力量")?, self.prop("敏捷")?, self.prop("体型")?);
        Some(if dex < siz && str_ < siz {
            7
        } else if dex > siz && str_ > siz {
            9
        } else {
            8
        })
    }

    fn computed(&self, key: &str) -> Option<i64> {
        match key {
            "体格" => self.build_and_db().map(|(build, _)| build),
            "最大生命值" => self.max_hp(),
            "最大魔法值" => self.max_mp(),
            "移动力" => self.movement(),
            "闪避" => self.prop("敏捷").map(|dex| dex / 2),
            "母语" => self.prop("教育"),
            _ => SKILL_BASES
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, base)| *base),
        }
    }

    fn lookup(&self, input: &str, name: &str) -> Option<Entry> {
        let key = normalize(SYNONYMS, name);
        if let Some((k, v)) = find_key(&self.props, key) {
            return Some(Entry::stored(input, k, *v, EntryKind::Props));
        }
        if let Some((k, v)) = find_key(&self.skills, key) {
            return Some(Entry::stored(input, k, *v, EntryKind::Skills));
        }
        if let Some((k, v)) = find_key(&self.basic, key) {
            return Some(Entry::stored(input, k, *v, EntryKind::Basic));
        }
        self.computed(key).map(|v| Entry::computed(input, key, v))
    }

    fn put(map: &mut BTreeMap<String, i64>, core: &mut CardCore, key: &str, value: i64) -> bool {
        let old = map.insert(key.to_string(), value);
        core.record(key, old, value)
    }

    fn set_hp(&mut self, value: i64) -> bool {
        let value = match self.max_hp() {
            Some(max) => value.clamp(0, max.max(0)),
            None => value.max(0),
        };
        Self::put(&mut self.basic, &mut self.core, HP, value)
    }

    fn set_mp(&mut self, value: i64) -> bool {
        let value = match self.max_mp() {
            Some(max) => value.clamp(0, max.max(0)),
            None => value.max(0),
        };
        Self::put(&mut self.basic, &mut self.core, MP, value)
    }

    fn set_san(&mut self, value: i64) -> bool {
        let value = value.clamp(0, self.max_san().max(0));
        Self::put(&mut self.basic, &mut self.core, SAN, value)
    }

    fn set_cm(&mut self, value: i64) -> bool {
        let changed = Self::put(&mut self.skills, &mut self.core, CM, value.clamp(0, 99));
        let max_san = self.max_san();
        match self.basic.get(SAN).copied() {
            Some(san) if san > max_san => changed | self.set_san(san),
            _ => changed,
        }
    }

    /// Mark a skill for a growth check.
    pub fn mark_growth(&mut self, key: &str) -> bool {
        let inserted = self.meta.skill_growth.insert(key.to_string());
        if inserted {
            self.core.record_growth(key, true);
        }
        inserted
    }

    /// Remove growth marks. An empty slice clears all of them.
    /// Returns whether any mark was removed.
    pub fn clear_growth(&mut self, keys: &[String]) -> bool {
        let removed: Vec<String> = if keys.is_empty() {
            std::mem::take(&mut self.meta.skill_growth).into_iter().collect()
        } else {
            keys.iter()
                .filter(|key| self.meta.skill_growth.remove(key.as_str()))
                .cloned()
                .collect()
        };
        for key in &removed {
            self.core.record_growth(key, false);
        }
        !removed.is_empty()
    }

    /// Skills currently marked for growth.
    pub fn growth_skills(&self) -> Vec<String> {
        self.meta.skill_growth.iter().cloned().collect()
    }

    pub(super) fn migrate_from(&mut self, version: u32) {
        if version < 2 {
            // v1 kept resources among the skills.
            for key in BASIC {
                if let Some(value) = self.skills.remove(key) {
                    self.basic.entry(key.to_string()).or_insert(value);
                }
            }
        }
    }
}

fn join(map: &BTreeMap<String, i64>) -> String {
    map.iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl CardOps for CocCard {
    fn core(&self) -> &CardCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CardCore {
        &mut self.core
    }

    fn card_type(&self) -> CardType {
        CardType::Coc
    }

    fn get_entry(&self, input: &str) -> Option<Entry> {
        if let Some(entry) = self.lookup(input, input) {
            return Some(entry.with_difficulty(Difficulty::Normal));
        }
        let (difficulty, rest) = Difficulty::split(input);
        if difficulty == Difficulty::Normal {
            return None;
        }
        self.lookup(input, rest)
            .map(|entry| entry.with_difficulty(difficulty))
    }

    fn set_entry(&mut self, input: &str, value: i64) -> bool {
        let key = normalize(SYNONYMS, input);
        if PROPS.contains(&key) {
            return Self::put(&mut self.props, &mut self.core, key, value);
        }
        match key {
            HP => self.set_hp(value),
            MP => self.set_mp(value),
            SAN => self.set_san(value),
            CM => self.set_cm(value),
            LUCK => Self::put(&mut self.basic, &mut self.core, LUCK, value),
            _ => {
                let stored = find_key(&self.skills, key)
                    .map(|(k, _)| k.clone())
                    .unwrap_or_else(|| key.to_string());
                Self::put(&mut self.skills, &mut self.core, &stored, value)
            }
        }
    }

    fn get_ability(&self, input: &str) -> Option<Ability> {
        if let Some(ability) = self.core.ability(input) {
            return Some(ability);
        }
        if normalize(SYNONYMS, input) != "伤害加值" {
            return None;
        }
        let (_, db) = self.build_and_db()?;
        Some(Ability {
            input: input.to_string(),
            key: "伤害加值".to_string(),
            expression: db,
            readonly: true,
        })
    }

    fn aliases(&self, key: &str) -> Vec<String> {
        synonyms_of(SYNONYMS, normalize(SYNONYMS, key))
    }

    fn summary(&self) -> String {
        let mut lines = vec![format!("{} (coc)", self.core.name)];
        if !self.props.is_empty() {
            lines.push(format!("属性: {}", join(&self.props)));
        }
        if !self.basic.is_empty() {
            lines.push(format!("状态: {}", join(&self.basic)));
        }
        if !self.skills.is_empty() {
            lines.push(format!("技能: {}", join(&self.skills)));
        }
        if !self.core.abilities.is_empty() {
            let abilities: Vec<String> = self
                .core
                .abilities
                .iter()
                .map(|(k, v)| format!("{k}:{v}"))
                .collect();
            lines.push(format!("能力: {}", abilities.join(" ")));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::ChangedValue;

    fn investigator() -> CocCard {
        let mut card = CocCard::new("Maca");
        for (k, v) in [("力量", 60), ("体质", 50), ("体型", 60), ("敏捷", 70), ("意志", 55), ("教育", 80)] {
            card.set_entry(k, v);
        }
        card.set_entry("侦查", 40);
        card.set_entry("理智", 55);
        card.core.drain_changes();
        card
    }

    #[test]
    fn synonyms_resolve() {
        let card = investigator();
        assert_eq!(card.get_entry("侦察").unwrap().key, "侦查");
        assert_eq!(card.get_entry("STR").unwrap().value, 60);
        assert_eq!(card.get_entry("san").unwrap().value, 55);
    }

    #[test]
    fn difficulty_divides_target_not_base() {
        let card = investigator();
        let hard = card.get_entry("困难侦查").unwrap();
        assert_eq!(hard.value, 20);
        assert_eq!(hard.base_value, 40);
        let ex = card.get_entry("极难侦察").unwrap();
        assert_eq!(ex.value, 8);
    }

    #[test]
    fn computed_values() {
        let card = investigator();
        assert_eq!(card.get_entry("体格").unwrap().value, 0);
        assert!(card.get_entry("体格").unwrap().readonly);
        assert_eq!(card.get_entry("最大生命值").unwrap().value, 11);
        assert_eq!(card.get_entry("最大魔法值").unwrap().value, 11);
        assert_eq!(card.get_entry("闪避").unwrap().value, 35);
        assert_eq!(card.get_entry("母语").unwrap().value, 80);
        assert_eq!(card.get_entry("图书馆").unwrap().value, 20);
        assert_eq!(card.get_ability("db").unwrap().expression, "0");
    }

    #[test]
    fn user_value_shadows_builtin() {
        let mut card = investigator();
        assert_eq!(card.get_entry("体格").unwrap().value, 0);
        assert!(card.set_entry("体格", 5));
        let entry = card.get_entry("体格").unwrap();
        assert_eq!(entry.value, 5);
        assert_eq!(entry.kind, EntryKind::Skills);
    }

    #[test]
    fn hp_is_clamped_and_only_real_changes_emit() {
        let mut card = investigator();
        assert!(card.set_entry("hp", 30));
        assert_eq!(card.get_entry("hp").unwrap().value, 11);
        assert!(!card.set_entry("hp", 99));
        let changes = card.core.drain_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].new_value(), Some(11));
    }

    #[test]
    fn cthulhu_mythos_reclamps_sanity() {
        let mut card = investigator();
        card.set_entry("cm", 50);
        assert_eq!(card.get_entry("理智").unwrap().value, 49);
        assert!(!card.set_entry("san", 80));
    }

    #[test]
    fn growth_marks() {
        let mut card = investigator();
        assert!(card.mark_growth("侦查"));
        assert!(!card.mark_growth("侦查"));
        assert_eq!(card.growth_skills(), vec!["侦查".to_string()]);
        assert!(card.clear_growth(&[]));
        assert!(card.growth_skills().is_empty());
        assert!(!card.clear_growth(&["侦查".to_string()]));

        let changes: Vec<(String, ChangedValue)> =
            card.core.drain_changes().into_iter().map(|c| (c.key, c.value)).collect();
        assert_eq!(
            changes,
            [
                ("侦查".to_string(), ChangedValue::GrowthMark { marked: true }),
                ("侦查".to_string(), ChangedValue::GrowthMark { marked: false }),
            ]
        );
    }

    #[test]
    fn v1_moves_resources_to_basic() {
        let mut card = CocCard::new("old");
        card.skills.insert("理智".into(), 45);
        card.migrate_from(1);
        assert_eq!(card.basic.get("理智"), Some(&45));
        assert!(!card.skills.contains_key("理智"));
    }

    #[test]
    fn aliases_list_synonyms() {
        let card = investigator();
        let aliases = card.aliases("侦查");
        assert!(aliases.contains(&"侦察".to_string()));
    }
}
