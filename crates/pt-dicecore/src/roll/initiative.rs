//! Initiative: `ri [expr] [name], ...` rolls into the channel list, `init`
//! shows it, `init clr` clears it and `init del a,b` removes entries.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::card::CardOps;
use crate::error::DiceResult;
use crate::initiative::RiItem;

use super::{RollEnv, RollEvaluator, RollKind, split_list, split_notation, strip_keyword};

/// Die rolled when an entry names no expression.
pub const INITIATIVE_DIE: &str = "d20";

static BONUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<bonus>[+\-]\s*\d+)\s*(?P<name>.*)$").expect("hardcoded regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
enum Seq {
    Fixed(i64),
    Roll(String),
    Default,
}

fn parse_item(text: &str) -> (Seq, String) {
    let text = text.trim();
    if let Some(caps) = BONUS.captures(text) {
        let bonus = caps["bonus"].replace(' ', "");
        return (Seq::Roll(format!("{INITIATIVE_DIE}{bonus}")), caps["name"].trim().to_string());
    }
    match split_notation(text) {
        Some((head, name)) => match head.parse::<i64>() {
            Ok(value) => (Seq::Fixed(value), name.to_string()),
            Err(_) => (Seq::Roll(head.to_string()), name.to_string()),
        },
        None => (Seq::Default, text.to_string()),
    }
}

/// Rolls initiative for the sender or named non-players.
#[derive(Debug, Clone)]
pub struct InitiativeRoll {
    raw: String,
    items: Vec<RiItem>,
    output: String,
}

impl InitiativeRoll {
    /// Initiative for `raw`, the text after `ri`.
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            items: Vec::new(),
            output: String::new(),
        }
    }

    /// Entries that `apply` inserts.
    pub fn items(&self) -> &[RiItem] {
        &self.items
    }
}

impl RollEvaluator for InitiativeRoll {
    fn kind(&self) -> RollKind {
        RollKind::Initiative
    }

    fn roll(&mut self, env: &mut RollEnv<'_>) -> DiceResult<()> {
        let mut parts = split_list(&self.raw);
        if parts.is_empty() {
            parts.push(String::new());
        }
        let base = env.vars();
        let actor_name = base.get("人物卡名").unwrap_or_default().to_string();
        let dex = env
            .linked_card()
            .and_then(|c| c.as_dnd())
            .map(|dnd| (dnd.modifier_of("敏捷"), dnd.get_entry("敏捷").map_or(0, |e| e.value)));

        let mut lines = Vec::new();
        for part in parts {
            let (seq, name) = parse_item(&part);
            let is_actor = name.is_empty();
            let (value, shown, seq2) = match seq {
                Seq::Fixed(value) => (value, value.to_string(), 0),
                Seq::Roll(expression) => {
                    let result = pt_dice::roll(&expression, &mut *env.rng)?;
                    (result.total, result.output(), 0)
                }
                Seq::Default => {
                    let (expression, seq2) = match dex {
                        Some((modifier, score)) if is_actor && modifier != 0 => {
                            (format!("{INITIATIVE_DIE}{modifier:+}"), score)
                        }
                        Some((_, score)) if is_actor => (INITIATIVE_DIE.to_string(), score),
                        _ => (INITIATIVE_DIE.to_string(), 0),
                    };
                    let result = pt_dice::roll(&expression, &mut *env.rng)?;
                    (result.total, result.output(), seq2)
                }
            };
            let item = if is_actor {
                RiItem::actor(&env.context.user_id, &actor_name, value)
            } else {
                RiItem::npc(name, value)
            }
            .with_seq2(seq2);
            let vars = base.clone().with("人物名", &item.name).with("掷骰输出", shown);
            lines.push(env.render("roll.ri.line", &vars));
            self.items.push(item);
        }
        debug!(target: "dicecore::roll", entries = self.items.len(), "initiative rolled");
        self.output = lines.join("\n");
        Ok(())
    }

    fn output(&self) -> &str {
        &self.output
    }

    fn apply(&mut self, env: &mut RollEnv<'_>) -> DiceResult<Vec<String>> {
        for item in &self.items {
            env.initiative.upsert(&env.context.channel_id, item.clone());
        }
        Ok(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ListAction {
    Show,
    Clear,
    Delete(Vec<String>),
}

/// Shows or edits the channel's initiative list.
#[derive(Debug, Clone)]
pub struct InitiativeListRoll {
    action: ListAction,
    output: String,
}

impl InitiativeListRoll {
    /// List command for `raw`, the text after `init`.
    pub fn new(raw: &str) -> Self {
        let raw = raw.trim();
        let action = if strip_keyword(raw, "clr").is_some() || strip_keyword(raw, "clear").is_some() {
            ListAction::Clear
        } else if let Some(rest) = strip_keyword(raw, "del").or_else(|| strip_keyword(raw, "rm")) {
            ListAction::Delete(split_list(rest))
        } else {
            ListAction::Show
        };
        Self {
            action,
            output: String::new(),
        }
    }
}

impl RollEvaluator for InitiativeListRoll {
    fn kind(&self) -> RollKind {
        RollKind::InitiativeList
    }

    fn roll(&mut self, env: &mut RollEnv<'_>) -> DiceResult<()> {
        let base = env.vars();
        self.output = match &self.action {
            ListAction::Show => {
                let items = env.initiative.list(&env.context.channel_id).to_vec();
                if items.is_empty() {
                    env.render("roll.ri.empty", &base)
                } else {
                    let mut lines = vec![env.render("roll.ri.list", &base)];
                    for (i, item) in items.iter().enumerate() {
                        let vars = base
                            .clone()
                            .with("序号", i + 1)
                            .with("人物名", &item.name)
                            .with("先攻值", item.seq);
                        lines.push(env.render("roll.ri.item", &vars));
                    }
                    lines.join("\n")
                }
            }
            ListAction::Clear => env.render("roll.ri.clear", &base),
            ListAction::Delete(names) => {
                let vars = base.clone().with("人物名", names.join("、"));
                env.render("roll.ri.del", &vars)
            }
        };
        Ok(())
    }

    fn output(&self) -> &str {
        &self.output
    }

    fn apply(&mut self, env: &mut RollEnv<'_>) -> DiceResult<Vec<String>> {
        let channel = &env.context.channel_id;
        match &self.action {
            ListAction::Show => {}
            ListAction::Clear => env.initiative.clear(channel),
            ListAction::Delete(names) => {
                env.initiative.remove(channel, names);
            }
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Card, CardType};
    use crate::roll::testing::Harness;
    use pt_dice::{FixedRng, SequenceRng};

    #[test]
    fn item_forms() {
        assert_eq!(parse_item(""), (Seq::Default, String::new()));
        assert_eq!(parse_item("哥布林"), (Seq::Default, "哥布林".into()));
        assert_eq!(parse_item("+2 哥布林"), (Seq::Roll("d20+2".into()), "哥布林".into()));
        assert_eq!(parse_item("12 狼"), (Seq::Fixed(12), "狼".into()));
        assert_eq!(parse_item("d20+1 狼"), (Seq::Roll("d20+1".into()), "狼".into()));
    }

    #[test]
    fn rolls_into_the_channel_list() {
        let mut harness = Harness::new();
        let mut rng = SequenceRng::new(vec![9, 14]);
        let roll = harness.run(InitiativeRoll::new("哥布林, 12 狼, +1 Maca的猫"), &mut rng);
        insta::assert_snapshot!(roll.output(), @r"
        哥布林 🎲 先攻 d20: [9] = 9
        狼 🎲 先攻 12
        Maca的猫 🎲 先攻 d20+1: [14]+1 = 15
        ");
        let names: Vec<&str> = harness.initiative.list("c1").iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Maca的猫", "狼", "哥布林"]);
    }

    #[test]
    fn dnd_actor_adds_dexterity() {
        let mut card = Card::new(CardType::Dnd, "Tav");
        card.set_entry("敏捷", 14);
        let mut harness = Harness::new().with_card(card);
        let roll = harness.run(InitiativeRoll::new(""), &mut FixedRng(10));
        assert_eq!(roll.output(), "Tav 🎲 先攻 d20+2: [10]+2 = 12");
        let item = &harness.initiative.list("c1")[0];
        assert_eq!((item.id.as_str(), item.seq, item.seq2), ("u1", 12, 14));
    }

    #[test]
    fn list_clear_and_delete() {
        let mut harness = Harness::new();
        let roll = harness.run(InitiativeListRoll::new(""), &mut FixedRng(1));
        assert_eq!(roll.output(), "当前先攻列表为空");

        harness.run(InitiativeRoll::new("5 a, 7 b, 3 c"), &mut FixedRng(1));
        let roll = harness.run(InitiativeListRoll::new(""), &mut FixedRng(1));
        insta::assert_snapshot!(roll.output(), @r"
        当前先攻列表：
        1. b 7
        2. a 5
        3. c 3
        ");

        let roll = harness.run(InitiativeListRoll::new("del a，c"), &mut FixedRng(1));
        assert_eq!(roll.output(), "Maca 删除先攻：a、c");
        assert_eq!(harness.initiative.list("c1").len(), 1);

        harness.run(InitiativeListRoll::new("clr"), &mut FixedRng(1));
        assert!(harness.initiative.list("c1").is_empty());
    }
}
