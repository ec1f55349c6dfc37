//! Roll evaluators and the roll lifecycle.
//!
//! Every command becomes a [`Roll`] wrapping one [`RollEvaluator`]. A roll
//! moves through three phases: `roll()` performs all randomness once,
//! `output()` reads the computed text, and `apply_to_card()` commits card
//! changes at most once.

pub mod admin;
pub mod death;
pub mod edit;
pub mod growth;
pub mod initiative;
pub mod link;
pub mod opposed;
pub mod sanity;
pub mod standard;

pub use admin::CardAdminRoll;
pub use death::DeathSaveRoll;
pub use edit::CardEditRoll;
pub use growth::GrowthRoll;
pub use initiative::{InitiativeListRoll, InitiativeRoll};
pub use link::LinkRoll;
pub use opposed::{OpposedCache, OpposedRoll, OpposedSnapshot};
pub use sanity::SanCheckRoll;
pub use standard::{RollRecord, SkillCheck, StandardRoll, StandardRollState, TestRecord};

use std::fmt;

use pt_dice::DiceRng;
use pt_dice::lexer::is_notation_char;
use pt_dice::parser::MAX_NOTATION_LEN;

use crate::card::{Card, CardOps, CardProvider};
use crate::command::CommandContext;
use crate::config::{ResolvedConfig, TextVars};
use crate::error::{DiceError, DiceResult};
use crate::initiative::InitiativeProvider;

/// Which evaluator a roll uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RollKind {
    /// A plain or skill-tested roll.
    Standard,
    /// A standard roll answering an earlier one.
    Opposed,
    /// `sc`.
    SanCheck,
    /// `en`.
    Growth,
    /// `ri`.
    Initiative,
    /// `init`.
    InitiativeList,
    /// `st`.
    CardEdit,
    /// `ds`.
    DeathSave,
    /// `nn`.
    Link,
    /// `pc`.
    CardAdmin,
}

/// Where a roll is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollPhase {
    /// Constructed, nothing rolled.
    Pending,
    /// Rolled; output is available.
    Rolled,
    /// Changes committed.
    Applied,
}

impl fmt::Display for RollPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollPhase::Pending => write!(f, "pending"),
            RollPhase::Rolled => write!(f, "rolled"),
            RollPhase::Applied => write!(f, "applied"),
        }
    }
}

/// Everything an evaluator may read or change.
pub struct RollEnv<'a> {
    /// Sender and channel.
    pub context: &'a CommandContext,
    /// The channel's config.
    pub config: ResolvedConfig<'a>,
    /// Live cards and links.
    pub cards: &'a mut CardProvider,
    /// Initiative lists.
    pub initiative: &'a mut InitiativeProvider,
    /// Randomness.
    pub rng: &'a mut dyn DiceRng,
}

impl RollEnv<'_> {
    /// The sender's linked card.
    pub fn linked_card(&self) -> Option<&Card> {
        self.cards
            .linked_card(&self.context.channel_id, &self.context.user_id)
    }

    /// Name of the sender's linked card.
    pub fn linked_name(&self) -> Option<String> {
        self.cards
            .linked_name(&self.context.channel_id, &self.context.user_id)
    }

    /// `用户名`, `人物卡名` and `at用户`.
    pub fn vars(&self) -> TextVars {
        let card_name = self
            .linked_card()
            .map_or_else(|| self.context.username.clone(), |c| c.name().to_string());
        TextVars::new()
            .with("用户名", &self.context.username)
            .with("人物卡名", card_name)
            .with("at用户", self.context.mention())
    }

    /// Render a text key.
    pub fn render(&mut self, key: &str, vars: &TextVars) -> String {
        self.config.render(key, vars, &mut *self.rng)
    }
}

/// One command's evaluation.
pub trait RollEvaluator: Send {
    /// The evaluator's kind.
    fn kind(&self) -> RollKind;

    /// Perform all randomness and compute the output.
    fn roll(&mut self, env: &mut RollEnv<'_>) -> DiceResult<()>;

    /// The public output.
    fn output(&self) -> &str;

    /// Output meant only for the sender, for hidden rolls.
    fn private_output(&self) -> Option<&str> {
        None
    }

    /// Commit changes. Returns the names of cards that changed.
    fn apply(&mut self, _env: &mut RollEnv<'_>) -> DiceResult<Vec<String>> {
        Ok(Vec::new())
    }

    /// What an opposed reply compares against, if this roll qualifies.
    fn opposed_snapshot(&self) -> Option<OpposedSnapshot> {
        None
    }

    /// Whether the roll asked to be registered for opposed replies.
    fn wants_opposed(&self) -> bool {
        false
    }
}

/// A command bound to an evaluator.
pub struct Roll {
    evaluator: Box<dyn RollEvaluator>,
    phase: RollPhase,
    context: CommandContext,
    command: String,
}

impl fmt::Debug for Roll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Roll")
            .field("kind", &self.kind())
            .field("phase", &self.phase)
            .field("command", &self.command)
            .finish()
    }
}

impl Roll {
    /// Bind `command` to an evaluator.
    pub fn new(
        command: impl Into<String>,
        context: CommandContext,
        evaluator: Box<dyn RollEvaluator>,
    ) -> Self {
        Self {
            evaluator,
            phase: RollPhase::Pending,
            context,
            command: command.into(),
        }
    }

    /// The evaluator's kind.
    pub fn kind(&self) -> RollKind {
        self.evaluator.kind()
    }

    /// Current phase.
    pub fn phase(&self) -> RollPhase {
        self.phase
    }

    /// Sender and channel.
    pub fn context(&self) -> &CommandContext {
        &self.context
    }

    /// The command after alias expansion.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Evaluate. Only valid once.
    pub fn roll(&mut self, env: &mut RollEnv<'_>) -> DiceResult<()> {
        if self.phase != RollPhase::Pending {
            return Err(DiceError::InvalidPhase(format!(
                "roll() called on a {} roll",
                self.phase
            )));
        }
        self.evaluator.roll(env)?;
        self.phase = RollPhase::Rolled;
        Ok(())
    }

    /// The public output; empty until rolled.
    pub fn output(&self) -> &str {
        match self.phase {
            RollPhase::Pending => "",
            RollPhase::Rolled | RollPhase::Applied => self.evaluator.output(),
        }
    }

    /// Output meant only for the sender.
    pub fn private_output(&self) -> Option<&str> {
        match self.phase {
            RollPhase::Pending => None,
            RollPhase::Rolled | RollPhase::Applied => self.evaluator.private_output(),
        }
    }

    /// Commit changes. Only valid once, after rolling.
    pub fn apply_to_card(&mut self, env: &mut RollEnv<'_>) -> DiceResult<Vec<String>> {
        if self.phase != RollPhase::Rolled {
            return Err(DiceError::InvalidPhase(format!(
                "apply_to_card() called on a {} roll",
                self.phase
            )));
        }
        let changed = self.evaluator.apply(env)?;
        self.phase = RollPhase::Applied;
        Ok(changed)
    }

    /// What an opposed reply compares against.
    pub fn opposed_snapshot(&self) -> Option<OpposedSnapshot> {
        match self.phase {
            RollPhase::Pending => None,
            RollPhase::Rolled | RollPhase::Applied => self.evaluator.opposed_snapshot(),
        }
    }

    /// Whether the roll carried the `v` flag.
    pub fn wants_opposed(&self) -> bool {
        self.evaluator.wants_opposed()
    }
}

/// Strip a command keyword. The keyword must be followed by the end of the
/// text or by something other than an ASCII letter.
pub fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let head = text.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &text[keyword.len()..];
    match rest.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => None,
        _ => Some(rest.trim()),
    }
}

/// Split the longest leading dice notation off `text`.
///
/// Only the leading run of notation characters, up to the parser's length
/// cap, is tried.
pub fn split_notation(text: &str) -> Option<(&str, &str)> {
    let text = text.trim();
    let run = text
        .char_indices()
        .find(|(_, c)| !is_notation_char(*c))
        .map_or(text.len(), |(i, _)| i)
        .min(MAX_NOTATION_LEN);
    // The run is ASCII, so every offset in it is a char boundary.
    (1..=run)
        .rev()
        .map(|end| (text[..end].trim_end(), &text[end..]))
        .find(|(head, _)| !head.is_empty() && pt_dice::is_dice_notation(head))
        .map(|(head, rest)| (head, rest.trim()))
}

/// Split `a,b，c` into trimmed, non-empty parts.
pub fn split_list(text: &str) -> Vec<String> {
    text.split([',', '，'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::config::ChannelConfig;
    use crate::plugin::PluginProvider;

    /// Providers for evaluator tests: user `u1` named `Maca` in channel `c1`.
    pub(crate) struct Harness {
        pub context: CommandContext,
        pub cards: CardProvider,
        pub config: ChannelConfig,
        pub plugins: PluginProvider,
        pub initiative: InitiativeProvider,
    }

    impl Harness {
        pub fn new() -> Self {
            Self {
                context: CommandContext::new("u1", "Maca", "c1"),
                cards: CardProvider::new(),
                config: ChannelConfig::default(),
                plugins: PluginProvider::new(),
                initiative: InitiativeProvider::new(),
            }
        }

        /// Register `card` and link it to `u1`.
        pub fn with_card(mut self, card: Card) -> Self {
            let name = card.name().to_string();
            self.cards.register(card);
            self.cards.link("c1", "u1", Some(&name));
            self
        }

        pub fn roll(&mut self, evaluator: impl RollEvaluator + 'static, rng: &mut dyn DiceRng) -> Roll {
            let mut roll = Roll::new("", self.context.clone(), Box::new(evaluator));
            let mut env = RollEnv {
                context: &self.context,
                config: ResolvedConfig::new(&self.config, &self.plugins),
                cards: &mut self.cards,
                initiative: &mut self.initiative,
                rng,
            };
            roll.roll(&mut env).unwrap();
            roll
        }

        pub fn apply(&mut self, roll: &mut Roll, rng: &mut dyn DiceRng) -> DiceResult<Vec<String>> {
            let mut env = RollEnv {
                context: &self.context,
                config: ResolvedConfig::new(&self.config, &self.plugins),
                cards: &mut self.cards,
                initiative: &mut self.initiative,
                rng,
            };
            roll.apply_to_card(&mut env)
        }

        /// Roll and apply.
        pub fn run(&mut self, evaluator: impl RollEvaluator + 'static, rng: &mut dyn DiceRng) -> Roll {
            let mut roll = self.roll(evaluator, rng);
            self.apply(&mut roll, rng).unwrap();
            roll
        }

        pub fn entry(&self, card: &str, key: &str) -> Option<i64> {
            self.cards.get(card)?.get_entry(key).map(|e| e.value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use pt_dice::FixedRng;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use testing::Harness;

    #[test]
    fn phases_are_enforced() {
        let mut harness = Harness::new();
        let mut rng = FixedRng(3);
        let mut roll = harness.roll(StandardRoll::new("d6", Vec::new()), &mut rng);
        assert_eq!(roll.phase(), RollPhase::Rolled);
        assert_eq!(roll.output(), roll.output());
        harness.apply(&mut roll, &mut rng).unwrap();
        assert_eq!(roll.phase(), RollPhase::Applied);
        assert!(matches!(
            harness.apply(&mut roll, &mut rng),
            Err(DiceError::InvalidPhase(_))
        ));
    }

    #[test]
    fn pending_roll_has_no_output() {
        let roll = Roll::new(
            "d6",
            CommandContext::new("u1", "Maca", "c1"),
            Box::new(StandardRoll::new("d6", Vec::new())),
        );
        assert_eq!(roll.output(), "");
        assert_eq!(roll.kind(), RollKind::Standard);
        assert!(roll.opposed_snapshot().is_none());
    }

    #[test]
    fn keywords_need_a_boundary() {
        assert_eq!(strip_keyword("sc 1/d3", "sc"), Some("1/d3"));
        assert_eq!(strip_keyword("SC1/d3", "sc"), Some("1/d3"));
        assert_eq!(strip_keyword("st力量60", "st"), Some("力量60"));
        assert_eq!(strip_keyword("stealth", "st"), None);
        assert_eq!(strip_keyword("nn", "nn"), Some(""));
        assert_eq!(strip_keyword("死亡豁免", "死亡豁免"), Some(""));
        assert_eq!(strip_keyword("死", "死亡豁免"), None);
    }

    #[test]
    fn notation_prefix() {
        assert_eq!(split_notation("d100 侦察"), Some(("d100", "侦察")));
        assert_eq!(split_notation("d100侦察"), Some(("d100", "侦察")));
        assert_eq!(split_notation("1d6+2"), Some(("1d6+2", "")));
        assert_eq!(split_notation("d100 50"), Some(("d100", "50")));
        assert_eq!(split_notation("侦察 图书馆"), None);
        assert_eq!(split_notation(""), None);
    }

    #[test]
    fn notation_prefix_of_hostile_input() {
        let nested = format!("{}1{} 侦察", "(".repeat(100_000), ")".repeat(100_000));
        assert_eq!(split_notation(&nested), None);
        let signs = format!("{}d6 伤害", "-".repeat(100_000));
        assert_eq!(split_notation(&signs), None);
        let long = format!("d6 {}", "+1".repeat(10_000));
        assert_eq!(split_notation(&long).map(|(head, _)| head.len() <= MAX_NOTATION_LEN), Some(true));
    }

    #[test]
    fn lists_split_on_both_commas() {
        assert_eq!(split_list("a, b，c,,"), ["a", "b", "c"]);
    }

    proptest! {
        #[test]
        fn output_is_stable_once_rolled(seed in any::<u64>(), pick in 0usize..4) {
            let commands = ["d100", "3d6+2 伤害", "2#d20", "2d%kl1 侦查50"];
            let mut harness = Harness::new();
            let mut rng = StdRng::seed_from_u64(seed);
            let mut roll = harness.roll(StandardRoll::new(commands[pick], Vec::new()), &mut rng);
            let first = roll.output().to_string();
            prop_assert!(!first.is_empty());
            prop_assert_eq!(roll.output(), first.as_str());
            harness.apply(&mut roll, &mut rng).unwrap();
            prop_assert_eq!(roll.output(), first.as_str());
        }
    }
}
