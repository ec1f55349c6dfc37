//! Standard rolls: `r`, flags, repetition and skill tests.
//!
//! `r[h][q][v] [N#]expression description` where the leading `r` is
//! optional. The expression goes through expression-scope aliases and the
//! template parser; whatever follows the longest valid dice notation is the
//! description, and the description's words are matched against the linked
//! card (or inline values such as `侦查50`) to produce tests.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use pt_dice::{DiceRng, DiceRollResult};

use crate::alias::{self, AliasScope};
use crate::card::dnd::ability_modifier;
use crate::card::{Card, CardOps, CardType, Difficulty, Entry, EntryKind};
use crate::config::{ResolvedConfig, TextVars};
use crate::decider::{DecideInput, DecideResult, decide};
use crate::error::DiceResult;
use crate::plugin::HookKind;
use crate::template::{self, InlineRoll, ParseSource, TemplateEnv};

use super::{OpposedSnapshot, RollEnv, RollEvaluator, RollKind, split_notation};

/// Most repetitions a single `N#` may ask for.
pub const MAX_TIMES: u32 = 10;

static SKILL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<name>[^\s\d+\-]+)\s*(?P<op>[+\-]\s*\d+)?\s*(?P<num>\d+)?")
        .expect("hardcoded regex")
});

static TIMES: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)\s*#").expect("hardcoded regex"));

/// A skill named in the description that resolved to something testable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillCheck {
    /// Name as typed.
    pub name: String,
    /// `+N` / `-N` written after the name.
    pub modifier: i64,
    /// Number written after the name: a value for COC, a DC for DND.
    pub temp: Option<i64>,
    /// The card entry or inline value tested against.
    pub entry: Option<Entry>,
}

/// One test of one roll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRecord {
    /// Name as typed.
    pub skill: String,
    /// Canonical entry key.
    pub key: String,
    /// Source of the tested value.
    pub kind: EntryKind,
    /// Raw value before difficulty.
    pub base_value: i64,
    /// Value rolled against.
    pub target_value: i64,
    /// Modifier written in the command.
    pub modifier: i64,
    /// Whether the value came from the command.
    pub temp: bool,
    /// Decided level, if the decider reached one.
    pub decision: Option<DecideResult>,
}

/// One evaluated dice expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollRecord {
    /// Skill the roll was made for, for per-skill DND rolls.
    pub label: Option<String>,
    /// The roll.
    pub result: DiceRollResult,
    /// Tests against the roll.
    pub tests: Vec<TestRecord>,
}

/// The state `beforeDiceRoll` and `afterDiceRoll` hooks see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardRollState {
    /// Dice expression after alias and template expansion.
    pub expression: String,
    /// Text after the expression.
    pub description: String,
    /// `h`: only the sender sees the result.
    pub hidden: bool,
    /// `q`: totals only.
    pub quiet: bool,
    /// `v`: offered for opposed replies.
    pub vs: bool,
    /// `N#` repetitions.
    pub times: u32,
    /// Game system of the linked card.
    pub flavor: CardType,
    /// Resolved skills.
    pub skills: Vec<SkillCheck>,
    /// Results; empty before evaluation.
    pub rolls: Vec<RollRecord>,
}

impl Default for StandardRollState {
    fn default() -> Self {
        Self {
            expression: String::new(),
            description: String::new(),
            hidden: false,
            quiet: false,
            vs: false,
            times: 1,
            flavor: CardType::General,
            skills: Vec::new(),
            rolls: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Flags {
    hidden: bool,
    quiet: bool,
    vs: bool,
}

/// Split `r` and its flags off the command. Flags are only recognized
/// right after the `r`; a word like `religion` is not a prefix.
fn split_flags(text: &str) -> (Flags, &str) {
    let mut flags = Flags::default();
    let Some(after) = text.strip_prefix(['r', 'R']) else {
        return (flags, text);
    };
    let len = after
        .bytes()
        .take_while(|b| matches!(b.to_ascii_lowercase(), b'h' | b'q' | b'v'))
        .count();
    let rest = &after[len..];
    match rest.chars().next() {
        Some(c) if c.is_ascii_alphabetic() && !c.eq_ignore_ascii_case(&'d') => {
            return (Flags::default(), text);
        }
        _ => {}
    }
    for b in after[..len].bytes() {
        match b.to_ascii_lowercase() {
            b'h' => flags.hidden = true,
            b'q' => flags.quiet = true,
            _ => flags.vs = true,
        }
    }
    (flags, rest.trim_start())
}

fn split_times(text: &str) -> (u32, &str) {
    let Some(caps) = TIMES.captures(text) else {
        return (1, text);
    };
    let times = caps[1].parse::<u32>().unwrap_or(1).clamp(1, MAX_TIMES);
    let end = caps.get(0).map_or(0, |m| m.end());
    (times, text[end..].trim_start())
}

fn resolve_skills(description: &str, card: Option<&Card>, flavor: CardType) -> Vec<SkillCheck> {
    SKILL
        .captures_iter(description)
        .filter_map(|caps| {
            let name = caps.name("name")?.as_str().to_string();
            let modifier = caps
                .name("op")
                .and_then(|m| m.as_str().replace(' ', "").parse::<i64>().ok())
                .unwrap_or(0);
            let temp = caps.name("num").and_then(|m| m.as_str().parse::<i64>().ok());
            let entry = match flavor {
                CardType::Dnd => card.and_then(|c| c.get_entry(&name)),
                CardType::Coc | CardType::General => temp
                    .map(|value| Entry::temp(&name, value, Difficulty::split(&name).0))
                    .or_else(|| card.and_then(|c| c.get_entry(&name))),
            };
            let testable = match flavor {
                CardType::Dnd => entry.is_some() || temp.is_some(),
                CardType::Coc | CardType::General => entry.is_some(),
            };
            testable.then_some(SkillCheck {
                name,
                modifier,
                temp,
                entry,
            })
        })
        .collect()
}

/// Bonus a DND entry adds to a d20 roll.
fn dnd_bonus(entry: &Entry) -> i64 {
    match entry.kind {
        EntryKind::Props => ability_modifier(entry.value),
        EntryKind::Skills | EntryKind::Basic | EntryKind::Computed => entry.value,
    }
}

fn with_modifier(expression: &str, modifier: i64) -> String {
    if modifier == 0 {
        expression.to_string()
    } else {
        format!("{expression}{modifier:+}")
    }
}

fn first_d20(result: &DiceRollResult) -> Option<i64> {
    result.first_die(20).map(i64::from)
}

/// A plain or skill-tested roll.
#[derive(Debug, Clone, Default)]
pub struct StandardRoll {
    raw: String,
    history: Vec<InlineRoll>,
    state: StandardRollState,
    user_id: String,
    username: String,
    output: String,
    private: Option<String>,
    growth: Vec<String>,
}

impl StandardRoll {
    /// A roll of `raw`, continuing the inline rolls made while expanding
    /// command aliases.
    pub fn new(raw: impl Into<String>, history: Vec<InlineRoll>) -> Self {
        Self {
            raw: raw.into(),
            history,
            ..Self::default()
        }
    }

    /// Parsed and evaluated state.
    pub fn state(&self) -> &StandardRollState {
        &self.state
    }

    /// Inline rolls made before the main roll.
    pub fn history(&self) -> &[InlineRoll] {
        &self.history
    }

    /// Skills that will be marked for growth on apply.
    pub fn growth_candidates(&self) -> &[String] {
        &self.growth
    }

    fn evaluate(&mut self, config: ResolvedConfig<'_>, rng: &mut dyn DiceRng) -> DiceResult<()> {
        let state = &mut self.state;
        state.rolls.clear();
        let decider = config.decider(state.flavor);
        let times = state.times.clamp(1, MAX_TIMES);
        if state.flavor == CardType::Dnd && !state.skills.is_empty() {
            for _ in 0..times {
                for check in &state.skills {
                    let bonus = check.entry.as_ref().map_or(0, dnd_bonus) + check.modifier;
                    let result = pt_dice::roll(&with_modifier(&state.expression, bonus), rng)?;
                    let tests = check
                        .temp
                        .map(|dc| TestRecord {
                            skill: check.name.clone(),
                            key: check.entry.as_ref().map_or_else(|| check.name.clone(), |e| e.key.clone()),
                            kind: check.entry.as_ref().map_or(EntryKind::Skills, |e| e.kind),
                            base_value: dc,
                            target_value: dc,
                            modifier: check.modifier,
                            temp: true,
                            decision: decide(
                                decider,
                                &DecideInput {
                                    base_value: dc,
                                    target_value: dc,
                                    roll: result.total,
                                    first_d20: first_d20(&result),
                                },
                            ),
                        })
                        .into_iter()
                        .collect();
                    state.rolls.push(RollRecord {
                        label: Some(check.name.clone()),
                        result,
                        tests,
                    });
                }
            }
            return Ok(());
        }
        for _ in 0..times {
            let result = pt_dice::roll(&state.expression, rng)?;
            let tests = state
                .skills
                .iter()
                .filter_map(|check| {
                    let entry = check.entry.as_ref()?;
                    let target = entry.value + check.modifier;
                    Some(TestRecord {
                        skill: check.name.clone(),
                        key: entry.key.clone(),
                        kind: entry.kind,
                        base_value: entry.base_value,
                        target_value: target,
                        modifier: check.modifier,
                        temp: entry.is_temp,
                        decision: decide(
                            decider,
                            &DecideInput {
                                base_value: entry.base_value,
                                target_value: target,
                                roll: result.total,
                                first_d20: first_d20(&result),
                            },
                        ),
                    })
                })
                .collect();
            state.rolls.push(RollRecord {
                label: None,
                result,
                tests,
            });
        }
        Ok(())
    }

    /// Card skills that succeeded without help. Bonus-die rolls, opposed
    /// offers, inline values and positive modifiers never grow.
    fn collect_growth(&self) -> Vec<String> {
        let state = &self.state;
        if state.flavor != CardType::Coc || state.vs || state.expression.to_ascii_lowercase().contains("kl") {
            return Vec::new();
        }
        let mut keys: Vec<String> = Vec::new();
        for test in state.rolls.iter().flat_map(|r| &r.tests) {
            let eligible = !test.temp
                && test.modifier <= 0
                && test.kind == EntryKind::Skills
                && test.decision.is_some_and(|d| d.success);
            if eligible && !keys.contains(&test.key) {
                keys.push(test.key.clone());
            }
        }
        keys
    }

    fn result_text(&self, env: &mut RollEnv<'_>, base: &TextVars, record: &RollRecord) -> String {
        let vars = base
            .clone()
            .with("掷骰输出", record.result.output())
            .with("掷骰结果", record.result.total);
        let key = if self.state.quiet {
            "roll.result.quiet"
        } else {
            "roll.result"
        };
        env.render(key, &vars)
    }

    fn test_vars(
        &self,
        env: &mut RollEnv<'_>,
        base: &TextVars,
        record: &RollRecord,
        test: &TestRecord,
    ) -> TextVars {
        let decision = test
            .decision
            .map(|d| env.render(d.level.text_key(), base))
            .unwrap_or_default();
        base.clone()
            .with("技能", &test.skill)
            .with("掷骰输出", record.result.output())
            .with("掷骰结果", record.result.total)
            .with("目标值", test.target_value)
            .with("判定", decision)
    }

    fn tests_text(&self, env: &mut RollEnv<'_>, base: &TextVars, record: &RollRecord) -> String {
        match record.tests.as_slice() {
            [] => String::new(),
            [test] => {
                let vars = self.test_vars(env, base, record, test);
                env.render("roll.test", &vars)
            }
            tests => tests
                .iter()
                .map(|test| {
                    let vars = self.test_vars(env, base, record, test);
                    format!("\n{}", env.render("roll.test.compound", &vars))
                })
                .collect(),
        }
    }

    fn line_text(&self, env: &mut RollEnv<'_>, base: &TextVars, record: &RollRecord) -> String {
        match (&record.label, record.tests.first()) {
            (Some(_), Some(test)) => {
                let vars = self.test_vars(env, base, record, test);
                env.render("roll.dnd.line", &vars)
            }
            (Some(label), None) => {
                let vars = base
                    .clone()
                    .with("技能", label)
                    .with("掷骰输出", record.result.output());
                env.render("roll.dnd.line", &vars)
            }
            (None, _) => {
                let result = self.result_text(env, base, record);
                result + &self.tests_text(env, base, record)
            }
        }
    }

    fn render(&self, env: &mut RollEnv<'_>) -> String {
        let base = env.vars();
        let mut lines = Vec::new();
        for (i, inline) in self.history.iter().enumerate() {
            let key = if i == 0 {
                "roll.inline.first"
            } else {
                "roll.inline.middle"
            };
            let vars = base
                .clone()
                .with("描述", inline.label.as_deref().unwrap_or_default())
                .with("掷骰输出", inline.result.output());
            lines.push(env.render(key, &vars));
        }
        let start_key = if self.history.is_empty() {
            "roll.start"
        } else {
            "roll.inline.last"
        };
        let start = env.render(start_key, &base.clone().with("描述", &self.state.description));
        let main = match self.state.rolls.as_slice() {
            [single] => {
                let result = self.result_text(env, &base, single);
                format!("{start} {result}{}", self.tests_text(env, &base, single))
            }
            rolls => {
                let mut text = start;
                for record in rolls {
                    text.push('\n');
                    text.push_str(&self.line_text(env, &base, record));
                }
                text
            }
        };
        lines.push(main);
        lines.join("\n")
    }
}

impl RollEvaluator for StandardRoll {
    fn kind(&self) -> RollKind {
        RollKind::Standard
    }

    fn roll(&mut self, env: &mut RollEnv<'_>) -> DiceResult<()> {
        let (flags, rest) = split_flags(self.raw.trim());
        let (times, rest) = split_times(rest);
        let rest = rest.to_string();
        let config = env.config;
        let card = env
            .cards
            .linked_card(&env.context.channel_id, &env.context.user_id);
        let flavor = card.map_or(CardType::General, CardOps::card_type);

        let parsed = {
            let processors = config.alias_processors(AliasScope::Expression);
            let mut tenv = TemplateEnv::new(env.context, &mut *env.rng)
                .with_card(card)
                .with_parse_hooks(config.parse_hooks());
            let aliased = alias::resolve(&rest, &processors, &mut tenv, &mut self.history, 0)?;
            template::parse(&aliased, &mut tenv, &mut self.history, ParseSource::Command, 0)?
        };
        let (expression, description) = match split_notation(&parsed) {
            Some((expression, description)) => (expression.to_string(), description.to_string()),
            None => (
                config.default_expression(flavor).to_string(),
                parsed.trim().to_string(),
            ),
        };
        let skills = resolve_skills(&description, card, flavor);

        self.state = StandardRollState {
            expression,
            description,
            hidden: flags.hidden,
            quiet: flags.quiet,
            vs: flags.vs,
            times,
            flavor,
            skills,
            rolls: Vec::new(),
        };
        self.user_id = env.context.user_id.clone();
        self.username = env.context.username.clone();

        for hook in config.dice_roll_hooks(HookKind::BeforeDiceRoll) {
            hook.on_dice_roll(&mut self.state);
        }
        self.evaluate(config, &mut *env.rng)?;
        for hook in config.dice_roll_hooks(HookKind::AfterDiceRoll) {
            hook.on_dice_roll(&mut self.state);
        }
        debug!(
            target: "dicecore::roll",
            expression = %self.state.expression,
            rolls = self.state.rolls.len(),
            "standard roll evaluated"
        );

        self.growth = self.collect_growth();
        let text = self.render(env);
        if self.state.hidden {
            let vars = env.vars().with("描述", &self.state.description);
            self.output = env.render("roll.hidden", &vars);
            self.private = Some(text);
        } else {
            self.output = text;
            self.private = None;
        }
        Ok(())
    }

    fn output(&self) -> &str {
        &self.output
    }

    fn private_output(&self) -> Option<&str> {
        self.private.as_deref()
    }

    fn apply(&mut self, env: &mut RollEnv<'_>) -> DiceResult<Vec<String>> {
        if self.growth.is_empty() {
            return Ok(Vec::new());
        }
        let Some(card) = env
            .cards
            .linked_card_mut(&env.context.channel_id, &env.context.user_id)
        else {
            return Ok(Vec::new());
        };
        let name = card.name().to_string();
        let Some(coc) = card.as_coc_mut() else {
            return Ok(Vec::new());
        };
        let mut marked = false;
        for key in &self.growth {
            marked |= coc.mark_growth(key);
        }
        Ok(if marked { vec![name] } else { Vec::new() })
    }

    fn opposed_snapshot(&self) -> Option<OpposedSnapshot> {
        if self.state.hidden {
            return None;
        }
        let [record] = self.state.rolls.as_slice() else {
            return None;
        };
        let [test] = record.tests.as_slice() else {
            return None;
        };
        Some(OpposedSnapshot {
            user_id: self.user_id.clone(),
            username: self.username.clone(),
            card_type: self.state.flavor,
            skill: test.skill.clone(),
            level: test.decision.map(|d| d.level),
            target: test.target_value,
            total: record.result.total,
            output: record.result.output(),
        })
    }

    fn wants_opposed(&self) -> bool {
        self.state.vs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardProvider;
    use crate::command::CommandContext;
    use crate::config::ChannelConfig;
    use crate::initiative::InitiativeProvider;
    use crate::plugin::PluginProvider;
    use crate::roll::Roll;
    use pt_dice::{FixedRng, SequenceRng};

    fn investigator() -> Card {
        let mut card = Card::new(CardType::Coc, "Maca");
        card.set_entry("力量", 60);
        card.set_entry("侦查", 40);
        card.set_entry("图书馆使用", 70);
        card.set_entry("理智", 60);
        card
    }

    fn fighter() -> Card {
        let mut card = Card::new(CardType::Dnd, "Tav");
        card.set_entry("力量", 16);
        card.set_entry("运动", 1);
        card
    }

    fn run(command: &str, card: Option<Card>, rng: &mut dyn DiceRng) -> (Roll, CardProvider) {
        let context = CommandContext::new("u1", "Maca", "c1");
        let mut cards = CardProvider::new();
        if let Some(card) = card {
            let name = card.name().to_string();
            cards.register(card);
            cards.link("c1", "u1", Some(&name));
        }
        let config = ChannelConfig::default();
        let plugins = PluginProvider::new();
        let mut initiative = InitiativeProvider::new();
        let mut roll = Roll::new(command, context.clone(), Box::new(StandardRoll::new(command, Vec::new())));
        let mut env = RollEnv {
            context: &context,
            config: ResolvedConfig::new(&config, &plugins),
            cards: &mut cards,
            initiative: &mut initiative,
            rng,
        };
        roll.roll(&mut env).unwrap();
        roll.apply_to_card(&mut env).unwrap();
        (roll, cards)
    }

    #[test]
    fn flags_follow_the_r() {
        assert_eq!(split_flags("rhq d100").0, Flags { hidden: true, quiet: true, vs: false });
        assert_eq!(split_flags("rv侦察").1, "侦察");
        assert_eq!(split_flags("rd100").1, "d100");
        assert_eq!(split_flags("religion"), (Flags::default(), "religion"));
        assert_eq!(split_flags("d100"), (Flags::default(), "d100"));
    }

    #[test]
    fn repetition_is_capped() {
        assert_eq!(split_times("3#d6"), (3, "d6"));
        assert_eq!(split_times("99# d6"), (MAX_TIMES, "d6"));
        assert_eq!(split_times("d6"), (1, "d6"));
    }

    #[test]
    fn plain_roll() {
        let (roll, _) = run("r 3d6+2", None, &mut FixedRng(4));
        assert_eq!(roll.output(), "Maca 🎲 3d6+2: [4, 4, 4]+2 = 14");
    }

    #[test]
    fn skill_test_against_card() {
        let (roll, _) = run("d100 侦察", Some(investigator()), &mut FixedRng(2));
        assert_eq!(roll.output(), "Maca 🎲 侦察 d100: [2] = 2 / 40 成功");
    }

    #[test]
    fn default_expression_and_temp_value() {
        let (roll, _) = run("r 潜行50", None, &mut FixedRng(60));
        assert_eq!(roll.output(), "Maca 🎲 潜行50 d100: [60] = 60 / 50 失败");
    }

    #[test]
    fn difficulty_and_modifier() {
        let (roll, _) = run("困难侦察", Some(investigator()), &mut FixedRng(19));
        assert_eq!(roll.output(), "Maca 🎲 困难侦察 d100: [19] = 19 / 20 成功");
        let (roll, _) = run("侦察-10", Some(investigator()), &mut FixedRng(35));
        assert_eq!(roll.output(), "Maca 🎲 侦察-10 d100: [35] = 35 / 30 失败");
    }

    #[test]
    fn compound_tests_share_one_roll() {
        let (roll, _) = run("侦察 图书馆", Some(investigator()), &mut FixedRng(2));
        insta::assert_snapshot!(roll.output(), @r"
        Maca 🎲 侦察 图书馆 d100: [2] = 2
        侦察 2 / 40 成功
        图书馆 2 / 70 成功
        ");
    }

    #[test]
    fn repeated_rolls_list_lines() {
        let mut rng = SequenceRng::new(vec![10, 90]);
        let (roll, _) = run("r2#d100 侦察", Some(investigator()), &mut rng);
        insta::assert_snapshot!(roll.output(), @r"
        Maca 🎲 侦察
        d100: [10] = 10 / 40 成功
        d100: [90] = 90 / 40 失败
        ");
    }

    #[test]
    fn quiet_shows_totals() {
        let (roll, _) = run("rq d6", None, &mut FixedRng(5));
        assert_eq!(roll.output(), "Maca 🎲 5");
    }

    #[test]
    fn hidden_roll_goes_private() {
        let (roll, _) = run("rh d100", None, &mut FixedRng(7));
        assert_eq!(roll.output(), "Maca 在帷幕后面偷偷地 🎲，猜猜结果是什么");
        assert_eq!(roll.private_output(), Some("Maca 🎲 d100: [7] = 7"));
        assert!(roll.opposed_snapshot().is_none());
    }

    #[test]
    fn inline_rolls_are_narrated() {
        let (roll, _) = run("[[d4]]d6", None, &mut FixedRng(2));
        insta::assert_snapshot!(roll.output(), @r"
        Maca 先是 🎲 d4: [2] = 2
        最后 🎲 2d6: [2, 2] = 4
        ");
    }

    #[test]
    fn growth_marked_on_success() {
        let (_, cards) = run("侦察", Some(investigator()), &mut FixedRng(2));
        let card = cards.get("Maca").unwrap().as_coc().unwrap();
        assert_eq!(card.growth_skills(), ["侦查"]);
    }

    #[test]
    fn no_growth_for_help_or_failure() {
        for command in ["侦察+10", "侦察 40", "r2d%kl1 侦察", "rv 侦察"] {
            let (_, cards) = run(command, Some(investigator()), &mut FixedRng(2));
            let card = cards.get("Maca").unwrap().as_coc().unwrap();
            assert!(card.growth_skills().is_empty(), "{command}");
        }
        let (_, cards) = run("侦察", Some(investigator()), &mut FixedRng(99));
        assert!(cards.get("Maca").unwrap().as_coc().unwrap().growth_skills().is_empty());
    }

    #[test]
    fn dnd_skills_roll_separately_with_modifiers() {
        let (roll, _) = run("运动 力量 15", Some(fighter()), &mut FixedRng(10));
        insta::assert_snapshot!(roll.output(), @r"
        Maca 🎲 运动 力量 15
        运动 d20+5: [10]+5 = 15
        力量 d20+3: [10]+3 = 13 / 15 失败
        ");
    }

    #[test]
    fn dnd_single_check_with_dc() {
        let (roll, _) = run("运动 12", Some(fighter()), &mut FixedRng(20));
        assert_eq!(roll.output(), "Maca 🎲 运动 12 d20+5: [20]+5 = 25 / 12 大成功");
    }

    #[test]
    fn opposed_snapshot_for_single_test() {
        let (roll, _) = run("rv 侦察", Some(investigator()), &mut FixedRng(30));
        let snapshot = roll.opposed_snapshot().unwrap();
        assert_eq!(snapshot.skill, "侦察");
        assert_eq!(snapshot.target, 40);
        assert!(roll.wants_opposed());
        let (roll, _) = run("侦察 图书馆", Some(investigator()), &mut FixedRng(30));
        assert!(roll.opposed_snapshot().is_none());
    }
}
