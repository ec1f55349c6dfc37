//! Card edits: `st`, `st show [names]`, `st 力量60 hp-d6` and
//! `st &name=expr`.
//!
//! Numeric edits are previewed on a copy of the card during `roll()`; `apply`
//! replays the same writes on the live card so clamping matches the preview.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::card::{Card, CardOps};
use crate::error::DiceResult;

use super::{RollEnv, RollEvaluator, RollKind, strip_keyword};

static ASSIGN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<name>[^\s\d+\-=()*/%&]+)\s*(?P<op>[+\-=]?)\s*(?P<value>[0-9dD%()*/]+)")
        .expect("hardcoded regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Edit {
    Show(Vec<String>),
    Ability { name: String, expression: String },
    Values(String),
}

impl Edit {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Some(Edit::Show(Vec::new()));
        }
        if let Some(rest) = strip_keyword(raw, "show") {
            return Some(Edit::Show(rest.split_whitespace().map(String::from).collect()));
        }
        if let Some(rest) = raw.strip_prefix('&') {
            let (name, expression) = rest.split_once('=')?;
            let (name, expression) = (name.trim(), expression.trim());
            if name.is_empty() || expression.is_empty() {
                return None;
            }
            return Some(Edit::Ability {
                name: name.to_string(),
                expression: expression.to_string(),
            });
        }
        Some(Edit::Values(raw.to_string()))
    }
}

/// One value write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryWrite {
    /// Name as typed.
    pub input: String,
    /// Canonical key after the write.
    pub key: String,
    /// Rendered dice roll, when the value was rolled.
    pub roll: Option<String>,
    /// Value before, if the entry existed.
    pub old: Option<i64>,
    /// Value written, before any clamping.
    pub requested: i64,
    /// Value after clamping.
    pub new: i64,
}

/// Edits the linked card.
#[derive(Debug, Clone)]
pub struct CardEditRoll {
    edit: Option<Edit>,
    card: Option<String>,
    writes: Vec<EntryWrite>,
    output: String,
}

impl CardEditRoll {
    /// An edit for `raw`, the text after `st`.
    pub fn new(raw: &str) -> Self {
        Self {
            edit: Edit::parse(raw),
            card: None,
            writes: Vec::new(),
            output: String::new(),
        }
    }

    /// Writes previewed by `roll()`.
    pub fn writes(&self) -> &[EntryWrite] {
        &self.writes
    }

    fn preview(&mut self, env: &mut RollEnv<'_>, mut card: Card, text: &str) -> DiceResult<()> {
        for caps in ASSIGN.captures_iter(text) {
            let input = caps["name"].to_string();
            let value = &caps["value"];
            let (amount, roll) = match value.parse::<i64>() {
                Ok(amount) => (amount, None),
                Err(_) => {
                    let result = pt_dice::roll(value, &mut *env.rng)?;
                    (result.total, Some(result.output()))
                }
            };
            let old = card.get_entry(&input).map(|e| e.value);
            let requested = match &caps["op"] {
                "+" => old.unwrap_or(0) + amount,
                "-" => old.unwrap_or(0) - amount,
                _ => amount,
            };
            card.set_entry(&input, requested);
            let after = card.get_entry(&input);
            self.writes.push(EntryWrite {
                key: after.as_ref().map_or_else(|| input.clone(), |e| e.key.clone()),
                new: after.map_or(requested, |e| e.value),
                input,
                roll,
                old,
                requested,
            });
        }
        Ok(())
    }
}

impl RollEvaluator for CardEditRoll {
    fn kind(&self) -> RollKind {
        RollKind::CardEdit
    }

    fn roll(&mut self, env: &mut RollEnv<'_>) -> DiceResult<()> {
        let base = env.vars();
        let Some(card) = env.linked_card().cloned() else {
            self.output = env.render("card.empty", &base);
            return Ok(());
        };
        self.card = Some(card.name().to_string());
        let Some(edit) = self.edit.clone() else {
            self.output = env.render("roll.st.unsupported", &base);
            return Ok(());
        };
        match edit {
            Edit::Show(names) if names.is_empty() => {
                let vars = base.with("条目", card.summary());
                self.output = env.render("roll.st.show", &vars);
            }
            Edit::Show(names) => {
                let shown: Vec<String> = names
                    .iter()
                    .map(|name| match (card.get_entry(name), card.get_ability(name)) {
                        (Some(entry), _) => format!("{}:{}", entry.key, entry.value),
                        (None, Some(ability)) => format!("{}={}", ability.key, ability.expression),
                        (None, None) => format!("{name}:-"),
                    })
                    .collect();
                let vars = base.with("条目", shown.join(" "));
                self.output = env.render("roll.st.show", &vars);
            }
            Edit::Ability { name, expression } => {
                let prompt = env.render("roll.st.prompt", &base);
                let vars = base.with("条目", &name).with("表达式", &expression);
                self.output = format!("{prompt}\n{}", env.render("roll.st.ability", &vars));
            }
            Edit::Values(text) => {
                self.preview(env, card, &text)?;
                if self.writes.is_empty() {
                    self.output = env.render("roll.st.unsupported", &base);
                    return Ok(());
                }
                let mut lines = vec![env.render("roll.st.prompt", &base)];
                for write in &self.writes {
                    let mut vars = base
                        .clone()
                        .with("条目", &write.key)
                        .with("新值", write.new);
                    if let Some(roll) = &write.roll {
                        vars.set("掷骰输出", roll);
                    }
                    if let Some(old) = write.old {
                        vars.set("旧值", old);
                    }
                    lines.push(env.render("roll.st.line", &vars));
                }
                self.output = lines.join("\n");
            }
        }
        Ok(())
    }

    fn output(&self) -> &str {
        &self.output
    }

    fn apply(&mut self, env: &mut RollEnv<'_>) -> DiceResult<Vec<String>> {
        let (Some(name), Some(edit)) = (&self.card, &self.edit) else {
            return Ok(Vec::new());
        };
        let Some(card) = env.cards.get_mut(name) else {
            return Ok(Vec::new());
        };
        let changed = match edit {
            Edit::Show(_) => false,
            Edit::Ability { name, expression } => card.set_ability(name, expression),
            Edit::Values(_) => self
                .writes
                .iter()
                .fold(false, |changed, write| card.set_entry(&write.input, write.requested) | changed),
        };
        debug!(target: "dicecore::roll", card = %name, changed, "card edited");
        Ok(if changed { vec![name.clone()] } else { Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardType;
    use crate::roll::testing::Harness;
    use pt_dice::FixedRng;

    fn investigator() -> Card {
        let mut card = Card::new(CardType::Coc, "Maca");
        card.set_entry("体质", 50);
        card.set_entry("体型", 60);
        card.set_entry("生命值", 11);
        card
    }

    #[test]
    fn parses_forms() {
        assert_eq!(Edit::parse(""), Some(Edit::Show(Vec::new())));
        assert_eq!(Edit::parse("show hp"), Some(Edit::Show(vec!["hp".into()])));
        assert_eq!(
            Edit::parse("&徒手=1d3+$db"),
            Some(Edit::Ability {
                name: "徒手".into(),
                expression: "1d3+$db".into()
            })
        );
        assert_eq!(Edit::parse("&=1"), None);
        assert_eq!(Edit::parse("力量60"), Some(Edit::Values("力量60".into())));
    }

    #[test]
    fn sets_adds_and_subtracts() {
        let mut harness = Harness::new().with_card(investigator());
        let roll = harness.run(CardEditRoll::new("力量60 hp-d6 体型+5"), &mut FixedRng(4));
        insta::assert_snapshot!(roll.output(), @r"
        Maca(Maca) 设置：
        力量 60
        生命值 d6: [4] = 4，11 → 7
        体型 60 → 65
        ");
        assert_eq!(harness.entry("Maca", "力量"), Some(60));
        assert_eq!(harness.entry("Maca", "生命值"), Some(7));
        assert_eq!(harness.entry("Maca", "体型"), Some(65));
    }

    #[test]
    fn clamped_values_are_previewed() {
        let mut harness = Harness::new().with_card(investigator());
        let roll = harness.run(CardEditRoll::new("hp+20"), &mut FixedRng(1));
        assert!(roll.output().ends_with("生命值 11 → 11"), "{}", roll.output());
        assert_eq!(harness.entry("Maca", "生命值"), Some(11));
    }

    #[test]
    fn nothing_is_written_before_apply() {
        let mut harness = Harness::new().with_card(investigator());
        let roll = harness.roll(CardEditRoll::new("力量70"), &mut FixedRng(1));
        assert_eq!(harness.entry("Maca", "力量"), None);
        let mut roll = roll;
        let changed = harness.apply(&mut roll, &mut FixedRng(1)).unwrap();
        assert_eq!(changed, ["Maca"]);
        assert_eq!(harness.entry("Maca", "力量"), Some(70));
    }

    #[test]
    fn ability_and_show() {
        let mut harness = Harness::new().with_card(investigator());
        let roll = harness.run(CardEditRoll::new("&徒手=1d3"), &mut FixedRng(1));
        assert_eq!(roll.output(), "Maca(Maca) 设置：\n徒手 = 1d3");
        let roll = harness.run(CardEditRoll::new("show 徒手 体质"), &mut FixedRng(1));
        assert_eq!(roll.output(), "Maca(Maca)：\n徒手=1d3 体质:50");
    }

    #[test]
    fn needs_a_card_and_something_to_set() {
        let mut harness = Harness::new();
        let roll = harness.run(CardEditRoll::new("力量60"), &mut FixedRng(1));
        assert_eq!(roll.output(), "Maca 没有关联人物卡");
        let mut harness = Harness::new().with_card(investigator());
        let roll = harness.run(CardEditRoll::new("???"), &mut FixedRng(1));
        assert_eq!(roll.output(), "Maca 的指令无法识别要设置的条目");
    }
}
