//! Sanity checks: `sc success/failure [san]`.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use pt_dice::RollMode;

use crate::card::{CardOps, CardType};
use crate::decider::{DecideInput, SuccessLevel, decide};
use crate::error::DiceResult;

use super::{RollEnv, RollEvaluator, RollKind};

const SAN: &str = "理智";

static SC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<success>[^/\s]+)\s*/\s*(?P<failure>\S+?)(?:\s+(?P<temp>\d+))?\s*$")
        .expect("hardcoded regex")
});

/// A sanity check against the linked card or a value given inline.
#[derive(Debug, Clone, Default)]
pub struct SanCheckRoll {
    raw: String,
    card: Option<String>,
    temp: bool,
    change: Option<(i64, i64)>,
    output: String,
}

impl SanCheckRoll {
    /// A check of `raw`, the text after `sc`.
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            ..Self::default()
        }
    }

    /// `(old, new)` sanity once rolled.
    pub fn change(&self) -> Option<(i64, i64)> {
        self.change
    }
}

impl RollEvaluator for SanCheckRoll {
    fn kind(&self) -> RollKind {
        RollKind::SanCheck
    }

    fn roll(&mut self, env: &mut RollEnv<'_>) -> DiceResult<()> {
        let base = env.vars();
        let Some(caps) = SC.captures(&self.raw) else {
            self.output = env.render("roll.sc.unsupported", &base);
            return Ok(());
        };
        let temp = caps.name("temp").and_then(|m| m.as_str().parse::<i64>().ok());
        let linked = env.linked_card();
        let san = temp.or_else(|| linked.and_then(|c| c.get_entry(SAN)).map(|e| e.value));
        let Some(old) = san else {
            self.output = env.render("roll.sc.unsupported", &base);
            return Ok(());
        };
        self.temp = temp.is_some();
        self.card = linked.map(|c| c.name().to_string());

        let check = pt_dice::roll("d100", &mut *env.rng)?;
        let decision = decide(
            env.config.decider(CardType::Coc),
            &DecideInput {
                base_value: old,
                target_value: old,
                roll: check.total,
                first_d20: None,
            },
        );
        let level = decision.map(|d| d.level);
        let loss = match level {
            Some(SuccessLevel::Worst) => {
                pt_dice::roll_with(&caps["failure"], &mut *env.rng, RollMode::Maximize)?
            }
            _ if decision.map_or(check.total <= old, |d| d.success) => {
                pt_dice::roll(&caps["success"], &mut *env.rng)?
            }
            _ => pt_dice::roll(&caps["failure"], &mut *env.rng)?,
        };
        let new = (old - loss.total).max(0);
        debug!(target: "dicecore::roll", old, new, check = check.total, "sanity check");

        let judgement = level
            .map(|l| env.render(l.text_key(), &base))
            .unwrap_or_default();
        let first = base
            .clone()
            .with("掷骰输出", check.output())
            .with("目标值", old)
            .with("判定", judgement);
        let second = base.clone().with("掷骰输出", loss.output());
        let third = base.clone().with("旧值", old).with("新值", new);
        self.output = [
            env.render("roll.sc.first", &first),
            env.render("roll.sc.second", &second),
            env.render("roll.sc.third", &third),
        ]
        .join("\n");
        self.change = Some((old, new));
        Ok(())
    }

    fn output(&self) -> &str {
        &self.output
    }

    fn apply(&mut self, env: &mut RollEnv<'_>) -> DiceResult<Vec<String>> {
        let (Some((_, new)), Some(name), false) = (self.change, &self.card, self.temp) else {
            return Ok(Vec::new());
        };
        let Some(card) = env.cards.get_mut(name) else {
            return Ok(Vec::new());
        };
        Ok(if card.set_entry(SAN, new) {
            vec![name.clone()]
        } else {
            Vec::new()
        })
    }
}
