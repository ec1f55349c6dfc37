//! COC skill growth: `en`, `en list`, `en mark a b`, `en clear [a b]` and
//! `en skill [value]`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::card::{Card, CardOps, CardType};
use crate::config::TextVars;
use crate::error::DiceResult;

use super::{RollEnv, RollEvaluator, RollKind, strip_keyword};

/// Rolls above this always grow.
pub const ALWAYS_GROW_ABOVE: i64 = 95;

static ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?P<name>[^\s\d]+)\s*(?P<num>\d+)?").expect("hardcoded regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    RollMarked,
    Roll(Vec<(String, Option<i64>)>),
    List,
    Mark(Vec<String>),
    Clear(Vec<String>),
}

impl Action {
    fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let words = |rest: &str| rest.split_whitespace().map(String::from).collect::<Vec<_>>();
        if raw.is_empty() {
            return Action::RollMarked;
        }
        if strip_keyword(raw, "list") == Some("") {
            return Action::List;
        }
        if let Some(rest) = strip_keyword(raw, "mark") {
            return Action::Mark(words(rest));
        }
        if let Some(rest) = strip_keyword(raw, "clear") {
            return Action::Clear(words(rest));
        }
        Action::Roll(
            ITEM.captures_iter(raw)
                .map(|caps| {
                    let num = caps.name("num").and_then(|m| m.as_str().parse().ok());
                    (caps["name"].to_string(), num)
                })
                .collect(),
        )
    }
}

/// One growth check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrowthCheck {
    /// Name as typed.
    pub skill: String,
    /// Canonical key on the card.
    pub key: String,
    /// Whether the value came from the command.
    pub temp: bool,
    /// The d100 roll.
    pub roll: i64,
    /// Value before the check.
    pub old: i64,
    /// Amount gained, if the check succeeded.
    pub gain: Option<i64>,
}

impl GrowthCheck {
    /// Value after the check.
    pub fn new_value(&self) -> i64 {
        self.old + self.gain.unwrap_or(0)
    }
}

/// Skill growth for the linked COC card.
#[derive(Debug, Clone)]
pub struct GrowthRoll {
    action: Action,
    card: Option<String>,
    keys: Vec<String>,
    checks: Vec<GrowthCheck>,
    output: String,
}

impl GrowthRoll {
    /// Growth for `raw`, the text after `en`.
    pub fn new(raw: &str) -> Self {
        Self {
            action: Action::parse(raw),
            card: None,
            keys: Vec::new(),
            checks: Vec::new(),
            output: String::new(),
        }
    }

    /// Checks made by `roll()`.
    pub fn checks(&self) -> &[GrowthCheck] {
        &self.checks
    }

    fn check(
        env: &mut RollEnv<'_>,
        card: Option<&Card>,
        name: &str,
        temp: Option<i64>,
    ) -> DiceResult<Option<GrowthCheck>> {
        let (key, old) = match (temp, card.and_then(|c| c.get_entry(name))) {
            (Some(value), _) => (name.to_string(), value),
            (None, Some(entry)) => (entry.key, entry.base_value),
            (None, None) => return Ok(None),
        };
        let roll = pt_dice::roll("d100", &mut *env.rng)?.total;
        let gain = if roll > old || roll > ALWAYS_GROW_ABOVE {
            Some(pt_dice::roll("d10", &mut *env.rng)?.total)
        } else {
            None
        };
        Ok(Some(GrowthCheck {
            skill: name.to_string(),
            key,
            temp: temp.is_some(),
            roll,
            old,
            gain,
        }))
    }

    fn roll_checks(&mut self, env: &mut RollEnv<'_>, items: Vec<(String, Option<i64>)>) -> DiceResult<()> {
        let card = env
            .cards
            .linked_card(&env.context.channel_id, &env.context.user_id)
            .filter(|c| c.card_type() == CardType::Coc)
            .cloned();
        for (name, temp) in items {
            if let Some(check) = Self::check(env, card.as_ref(), &name, temp)? {
                self.checks.push(check);
            }
        }
        Ok(())
    }

    fn render_checks(&self, env: &mut RollEnv<'_>, base: &TextVars) -> String {
        if self.checks.is_empty() {
            return env.render("roll.en.empty", base);
        }
        let mut lines = vec![env.render("roll.en.start", base)];
        for check in &self.checks {
            let vars = base
                .clone()
                .with("技能", &check.skill)
                .with("掷骰结果", check.roll)
                .with("目标值", check.old)
                .with("成长", check.gain.is_some())
                .with("成长值", check.gain.unwrap_or(0))
                .with("旧值", check.old)
                .with("新值", check.new_value());
            lines.push(env.render("roll.en.line", &vars));
        }
        lines.join("\n")
    }
}

impl RollEvaluator for GrowthRoll {
    fn kind(&self) -> RollKind {
        RollKind::Growth
    }

    fn roll(&mut self, env: &mut RollEnv<'_>) -> DiceResult<()> {
        let base = env.vars();
        let linked = env.linked_card().filter(|c| c.card_type() == CardType::Coc);
        self.card = linked.map(|c| c.name().to_string());
        let marked = linked
            .and_then(Card::as_coc)
            .map(|c| c.growth_skills())
            .unwrap_or_default();
        let resolve = |name: &String| {
            linked
                .and_then(|c| c.get_entry(name))
                .map_or_else(|| name.clone(), |e| e.key)
        };

        match self.action.clone() {
            Action::Roll(items) => {
                self.roll_checks(env, items)?;
                self.output = self.render_checks(env, &base);
            }
            Action::RollMarked if self.card.is_none() => {
                self.output = env.render("card.empty", &base);
            }
            Action::RollMarked => {
                self.roll_checks(env, marked.into_iter().map(|k| (k, None)).collect())?;
                self.output = self.render_checks(env, &base);
            }
            Action::List | Action::Mark(_) | Action::Clear(_) if self.card.is_none() => {
                self.output = env.render("card.empty", &base);
            }
            Action::List if marked.is_empty() => {
                self.output = env.render("roll.en.empty", &base);
            }
            Action::List => {
                let vars = base.with("技能列表", marked.join("、"));
                self.output = env.render("roll.en.list", &vars);
            }
            Action::Mark(names) if names.is_empty() => {
                self.output = env.render("roll.en.empty", &base);
            }
            Action::Mark(names) | Action::Clear(names) => {
                let keys: Vec<String> = names.iter().map(resolve).collect();
                let vars = base.with("技能列表", keys.join("、"));
                let key = if matches!(self.action, Action::Mark(_)) {
                    "roll.en.mark"
                } else {
                    "roll.en.clear"
                };
                self.keys = keys;
                self.output = env.render(key, &vars);
            }
        }
        Ok(())
    }

    fn output(&self) -> &str {
        &self.output
    }

    fn apply(&mut self, env: &mut RollEnv<'_>) -> DiceResult<Vec<String>> {
        let Some(name) = &self.card else {
            return Ok(Vec::new());
        };
        let Some(card) = env.cards.get_mut(name) else {
            return Ok(Vec::new());
        };
        let mut changed = false;
        match &self.action {
            Action::RollMarked | Action::Roll(_) => {
                let mut rolled = Vec::new();
                for check in self.checks.iter().filter(|c| !c.temp) {
                    if check.gain.is_some() {
                        changed |= card.set_entry(&check.key, check.new_value());
                    }
                    rolled.push(check.key.clone());
                }
                if let (false, Some(coc)) = (rolled.is_empty(), card.as_coc_mut()) {
                    changed |= coc.clear_growth(&rolled);
                }
            }
            Action::Mark(_) => {
                if let Some(coc) = card.as_coc_mut() {
                    for key in &self.keys {
                        changed |= coc.mark_growth(key);
                    }
                }
            }
            Action::Clear(_) => {
                if let Some(coc) = card.as_coc_mut() {
                    changed |= coc.clear_growth(&self.keys);
                }
            }
            Action::List => {}
        }
        Ok(if changed { vec![name.clone()] } else { Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roll::testing::Harness;
    use pt_dice::{FixedRng, SequenceRng};

    fn investigator() -> Card {
        let mut card = Card::new(CardType::Coc, "Maca");
        card.set_entry("侦查", 40);
        card.set_entry("图书馆使用", 70);
        card
    }

    #[test]
    fn parses_sub_commands() {
        assert_eq!(Action::parse(""), Action::RollMarked);
        assert_eq!(Action::parse("list"), Action::List);
        assert_eq!(Action::parse("mark 侦查 聆听"), Action::Mark(vec!["侦查".into(), "聆听".into()]));
        assert_eq!(Action::parse("clear"), Action::Clear(Vec::new()));
        assert_eq!(
            Action::parse("侦查 潜行50"),
            Action::Roll(vec![("侦查".into(), None), ("潜行".into(), Some(50))])
        );
    }

    #[test]
    fn explicit_skill_grows_and_is_written() {
        let mut harness = Harness::new().with_card(investigator());
        let mut rng = SequenceRng::new(vec![50, 7]);
        let roll = harness.run(GrowthRoll::new("侦查"), &mut rng);
        insta::assert_snapshot!(roll.output(), @r"
        Maca 🎲 技能成长
        侦查 50 / 40 成功，成长 7，40 → 47
        ");
        assert_eq!(harness.entry("Maca", "侦查"), Some(47));
    }

    #[test]
    fn low_roll_does_not_grow() {
        let mut harness = Harness::new().with_card(investigator());
        let roll = harness.run(GrowthRoll::new("图书馆使用"), &mut FixedRng(30));
        assert!(roll.output().ends_with("图书馆使用 30 / 70 失败"), "{}", roll.output());
        assert_eq!(harness.entry("Maca", "图书馆使用"), Some(70));
    }

    #[test]
    fn above_ninety_five_always_grows() {
        let mut harness = Harness::new();
        let mut rng = SequenceRng::new(vec![97, 3]);
        let roll = harness.run(GrowthRoll::new("克苏鲁神话 99"), &mut rng);
        assert!(roll.output().ends_with("成长 3，99 → 102"), "{}", roll.output());
    }

    #[test]
    fn mark_then_roll_marked_clears_marks() {
        let mut harness = Harness::new().with_card(investigator());
        let roll = harness.run(GrowthRoll::new("mark 侦查 图书馆使用"), &mut FixedRng(1));
        assert_eq!(roll.output(), "Maca 已标记成长：侦查、图书馆使用");
        let roll = harness.run(GrowthRoll::new("list"), &mut FixedRng(1));
        assert_eq!(roll.output(), "Maca 当前可成长的技能：侦查、图书馆使用");

        let mut rng = SequenceRng::new(vec![80, 5, 10]);
        let roll = harness.run(GrowthRoll::new(""), &mut rng);
        assert_eq!(roll.output().lines().count(), 3);
        assert_eq!(harness.entry("Maca", "侦查"), Some(45));
        assert_eq!(harness.entry("Maca", "图书馆使用"), Some(70));
        let card = harness.cards.get("Maca").and_then(Card::as_coc).unwrap();
        assert!(card.growth_skills().is_empty());
    }

    #[test]
    fn clear_without_names_clears_all() {
        let mut harness = Harness::new().with_card(investigator());
        harness.run(GrowthRoll::new("mark 侦查"), &mut FixedRng(1));
        let roll = harness.run(GrowthRoll::new("clear"), &mut FixedRng(1));
        assert_eq!(roll.output(), "Maca 已清除成长标记");
        let roll = harness.run(GrowthRoll::new("list"), &mut FixedRng(1));
        assert_eq!(roll.output(), "Maca 没有可成长的技能");
    }

    #[test]
    fn needs_a_card_for_marks() {
        let mut harness = Harness::new();
        let roll = harness.run(GrowthRoll::new(""), &mut FixedRng(1));
        assert_eq!(roll.output(), "Maca 没有关联人物卡");
        let roll = harness.run(GrowthRoll::new("侦查"), &mut FixedRng(1));
        assert_eq!(roll.output(), "Maca 没有可成长的技能");
    }
}
