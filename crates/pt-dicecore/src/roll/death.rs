//! DND death saving throws: `ds` / `死亡豁免`.

use crate::card::CardOps;
use crate::card::dnd::DeathSaving;
use crate::error::DiceResult;

use super::{RollEnv, RollEvaluator, RollKind};

/// Successes or failures that end the sequence.
pub const DEATH_SAVE_LIMIT: u32 = 3;

const HP: &str = "生命值";

/// How a single death save went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathSaveOutcome {
    /// Natural 20: back up with 1 HP.
    Revived,
    /// Natural 1: two failures.
    CriticalFailure,
    /// 10 or higher.
    Success,
    /// Below 10.
    Failure,
}

impl DeathSaveOutcome {
    /// Classify a d20 face.
    pub fn of(face: i64) -> Self {
        match face {
            20.. => DeathSaveOutcome::Revived,
            ..=1 => DeathSaveOutcome::CriticalFailure,
            10..=19 => DeathSaveOutcome::Success,
            _ => DeathSaveOutcome::Failure,
        }
    }

    fn text_key(self) -> &'static str {
        match self {
            DeathSaveOutcome::Revived => "roll.ds.best",
            DeathSaveOutcome::CriticalFailure => "roll.ds.worst",
            DeathSaveOutcome::Success => "roll.ds.success",
            DeathSaveOutcome::Failure => "roll.ds.failure",
        }
    }

    /// Counters after this outcome, before any reset.
    pub fn tally(self, saving: DeathSaving) -> DeathSaving {
        match self {
            DeathSaveOutcome::Revived => DeathSaving::default(),
            DeathSaveOutcome::CriticalFailure => DeathSaving {
                failure: saving.failure + 2,
                ..saving
            },
            DeathSaveOutcome::Success => DeathSaving {
                success: saving.success + 1,
                ..saving
            },
            DeathSaveOutcome::Failure => DeathSaving {
                failure: saving.failure + 1,
                ..saving
            },
        }
    }
}

/// A death save for the linked DND card.
#[derive(Debug, Clone, Default)]
pub struct DeathSaveRoll {
    card: Option<String>,
    outcome: Option<DeathSaveOutcome>,
    saving: DeathSaving,
    output: String,
}

impl DeathSaveRoll {
    /// A new death save.
    pub fn new() -> Self {
        Self::default()
    }

    /// The outcome once rolled.
    pub fn outcome(&self) -> Option<DeathSaveOutcome> {
        self.outcome
    }
}

impl RollEvaluator for DeathSaveRoll {
    fn kind(&self) -> RollKind {
        RollKind::DeathSave
    }

    fn roll(&mut self, env: &mut RollEnv<'_>) -> DiceResult<()> {
        let base = env.vars();
        let Some((name, saving)) = env
            .linked_card()
            .and_then(|c| c.as_dnd())
            .map(|dnd| (dnd.name().to_string(), dnd.death_saving()))
        else {
            self.output = env.render("roll.ds.unsupported", &base);
            return Ok(());
        };
        let result = pt_dice::roll("d20", &mut *env.rng)?;
        let outcome = DeathSaveOutcome::of(result.total);
        let tally = outcome.tally(saving);

        let start = env.render("roll.ds.start", &base.clone().with("掷骰输出", result.output()));
        let mut lines = vec![format!("{start} {}", env.render(outcome.text_key(), &base))];
        let counts = base
            .clone()
            .with("成功次数", tally.success.min(DEATH_SAVE_LIMIT))
            .with("失败次数", tally.failure.min(DEATH_SAVE_LIMIT));
        lines.push(env.render("roll.ds.tally", &counts));
        if tally.success >= DEATH_SAVE_LIMIT {
            lines.push(env.render("roll.ds.stable", &base));
        } else if tally.failure >= DEATH_SAVE_LIMIT {
            lines.push(env.render("roll.ds.dead", &base));
        }

        self.saving = if tally.success >= DEATH_SAVE_LIMIT || tally.failure >= DEATH_SAVE_LIMIT {
            DeathSaving::default()
        } else {
            tally
        };
        self.card = Some(name);
        self.outcome = Some(outcome);
        self.output = lines.join("\n");
        Ok(())
    }

    fn output(&self) -> &str {
        &self.output
    }

    fn apply(&mut self, env: &mut RollEnv<'_>) -> DiceResult<Vec<String>> {
        let (Some(name), Some(outcome)) = (&self.card, self.outcome) else {
            return Ok(Vec::new());
        };
        let Some(dnd) = env.cards.get_mut(name).and_then(|c| c.as_dnd_mut()) else {
            return Ok(Vec::new());
        };
        dnd.set_death_saving(self.saving);
        if outcome == DeathSaveOutcome::Revived {
            dnd.set_entry(HP, 1);
        }
        Ok(vec![name.clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Card, CardType};
    use crate::roll::testing::Harness;
    use pt_dice::FixedRng;

    fn downed() -> Card {
        let mut card = Card::new(CardType::Dnd, "Tav");
        card.set_entry("最大生命值", 12);
        card.set_entry("生命值", 0);
        card
    }

    fn saving(harness: &Harness) -> DeathSaving {
        harness.cards.get("Tav").and_then(Card::as_dnd).unwrap().death_saving()
    }

    #[test]
    fn outcomes_by_face() {
        assert_eq!(DeathSaveOutcome::of(20), DeathSaveOutcome::Revived);
        assert_eq!(DeathSaveOutcome::of(1), DeathSaveOutcome::CriticalFailure);
        assert_eq!(DeathSaveOutcome::of(10), DeathSaveOutcome::Success);
        assert_eq!(DeathSaveOutcome::of(9), DeathSaveOutcome::Failure);
    }

    #[test]
    fn success_counts_up() {
        let mut harness = Harness::new().with_card(downed());
        let roll = harness.run(DeathSaveRoll::new(), &mut FixedRng(12));
        insta::assert_snapshot!(roll.output(), @r"
        Maca 🎲 死亡豁免 d20: [12] = 12 成功，死亡豁免成功 +1
        当前 成功 1 / 失败 0
        ");
        assert_eq!(saving(&harness), DeathSaving { success: 1, failure: 0 });
    }

    #[test]
    fn natural_twenty_revives() {
        let mut harness = Harness::new().with_card(downed());
        harness.run(DeathSaveRoll::new(), &mut FixedRng(3));
        harness.run(DeathSaveRoll::new(), &mut FixedRng(20));
        assert_eq!(saving(&harness), DeathSaving::default());
        assert_eq!(harness.entry("Tav", "生命值"), Some(1));
    }

    #[test]
    fn third_failure_ends_the_sequence() {
        let mut harness = Harness::new().with_card(downed());
        harness.run(DeathSaveRoll::new(), &mut FixedRng(5));
        let roll = harness.run(DeathSaveRoll::new(), &mut FixedRng(1));
        insta::assert_snapshot!(roll.output(), @r"
        Maca 🎲 死亡豁免 d20: [1] = 1 大失败！死亡豁免失败 +2
        当前 成功 0 / 失败 3
        已失败三次，角色死亡
        ");
        assert_eq!(saving(&harness), DeathSaving::default());
    }

    #[test]
    fn needs_a_dnd_card() {
        let mut harness = Harness::new().with_card(Card::new(CardType::Coc, "Maca"));
        let roll = harness.run(DeathSaveRoll::new(), &mut FixedRng(12));
        assert_eq!(roll.output(), "Maca 没有关联 DND 人物卡，无法进行死亡豁免");
    }
}
