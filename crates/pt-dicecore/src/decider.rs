//! Success-level deciding.
//!
//! A decider is an ordered list of `{level, expression}` rules. Each
//! expression is compiled once by the restricted interpreter and cached by
//! its text; the first rule that evaluates truthy decides the level.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::cache::{CompileCache, DEFAULT_ENTRIES};
use crate::expr::{self, CompiledExpr, ExprError, Vars};

/// Variables a decider rule may reference.
pub const DECIDER_VARS: [&str; 4] = ["baseValue", "targetValue", "roll", "firstD20"];

static PREDICATES: Lazy<CompileCache<CompiledExpr>> =
    Lazy::new(|| CompileCache::new(DEFAULT_ENTRIES));

/// The six success levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SuccessLevel {
    /// Fumble.
    #[serde(rename = "大失败")]
    Worst,
    /// Plain failure.
    #[serde(rename = "失败")]
    Failure,
    /// Plain success.
    #[serde(rename = "成功")]
    Success,
    /// Hard success.
    #[serde(rename = "困难成功")]
    Hard,
    /// Extreme success.
    #[serde(rename = "极难成功")]
    Extreme,
    /// Critical success.
    #[serde(rename = "大成功")]
    Best,
}

impl SuccessLevel {
    /// Whether this level counts as a success.
    pub fn is_success(self) -> bool {
        !matches!(self, SuccessLevel::Worst | SuccessLevel::Failure)
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            SuccessLevel::Worst => "大失败",
            SuccessLevel::Failure => "失败",
            SuccessLevel::Success => "成功",
            SuccessLevel::Hard => "困难成功",
            SuccessLevel::Extreme => "极难成功",
            SuccessLevel::Best => "大成功",
        }
    }

    /// Custom text key for this level.
    pub fn text_key(self) -> &'static str {
        match self {
            SuccessLevel::Worst => "test.worst",
            SuccessLevel::Failure => "test.failure",
            SuccessLevel::Success => "test.success",
            SuccessLevel::Hard => "test.hard",
            SuccessLevel::Extreme => "test.extreme",
            SuccessLevel::Best => "test.best",
        }
    }
}

impl fmt::Display for SuccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One rule of a decider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeciderRule {
    /// Level decided when the expression is truthy.
    pub level: SuccessLevel,
    /// Predicate over [`DECIDER_VARS`].
    pub expression: String,
}

impl DeciderRule {
    /// Create a rule.
    pub fn new(level: SuccessLevel, expression: impl Into<String>) -> Self {
        Self {
            level,
            expression: expression.into(),
        }
    }
}

/// A named, ordered rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollDeciderConfig {
    /// Item id within the owning plugin.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Rules in evaluation order.
    pub rules: Vec<DeciderRule>,
}

/// Inputs to a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecideInput {
    /// The raw skill or attribute value.
    pub base_value: i64,
    /// The value to roll against, after difficulty and modifiers.
    pub target_value: i64,
    /// The roll total.
    pub roll: i64,
    /// First natural d20 of the roll, if any.
    pub first_d20: Option<i64>,
}

impl DecideInput {
    fn vars(&self) -> Vars {
        let mut vars = Vars::with_capacity(DECIDER_VARS.len());
        vars.insert("baseValue".into(), self.base_value as f64);
        vars.insert("targetValue".into(), self.target_value as f64);
        vars.insert("roll".into(), self.roll as f64);
        vars.insert("firstD20".into(), self.first_d20.unwrap_or(0) as f64);
        vars
    }
}

/// A decided outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecideResult {
    /// Whether the level counts as a success.
    pub success: bool,
    /// The decided level.
    pub level: SuccessLevel,
}

impl From<SuccessLevel> for DecideResult {
    fn from(level: SuccessLevel) -> Self {
        Self {
            success: level.is_success(),
            level,
        }
    }
}

/// Compile a rule predicate through the shared cache.
pub fn compile_rule(expression: &str) -> Result<std::sync::Arc<CompiledExpr>, ExprError> {
    PREDICATES.get_or_compile(expression, || {
        expr::compile(expression, Some(&DECIDER_VARS))
    })
}

/// Decide the level of a roll. `None` when there is no decider, no rule
/// matches, or a rule fails.
pub fn decide(decider: Option<&RollDeciderConfig>, input: &DecideInput) -> Option<DecideResult> {
    let decider = decider?;
    let vars = input.vars();
    for rule in &decider.rules {
        let outcome = compile_rule(&rule.expression).and_then(|pred| pred.test(&vars));
        match outcome {
            Ok(true) => return Some(rule.level.into()),
            Ok(false) => {}
            Err(e) => {
                warn!(
                    target: "dicecore::decider",
                    decider = %decider.id,
                    expression = %rule.expression,
                    error = %e,
                    "decider rule failed"
                );
                return None;
            }
        }
    }
    None
}

fn rules(pairs: &[(SuccessLevel, &str)]) -> Vec<DeciderRule> {
    pairs
        .iter()
        .map(|(level, expr)| DeciderRule::new(*level, *expr))
        .collect()
}

/// Deciders shipped with the embedded pseudo-plugin.
pub fn embedded_deciders() -> Vec<RollDeciderConfig> {
    use SuccessLevel::*;
    vec![
        RollDeciderConfig {
            id: "coc0".into(),
            name: "COC 默认规则".into(),
            description: "出 1 大成功，出 100 大失败，不区分困难与极难".into(),
            rules: rules(&[
                (Worst, "roll == 100"),
                (Best, "roll == 1"),
                (Failure, "roll > targetValue"),
                (Success, "roll <= targetValue"),
            ]),
        },
        RollDeciderConfig {
            id: "coc1".into(),
            name: "COC 房规一".into(),
            description: "出 1-5 且 ≤ 成功率大成功，出 96-100 且 > 成功率大失败".into(),
            rules: rules(&[
                (Worst, "roll >= 96 && roll > targetValue"),
                (Best, "roll <= 5 && roll <= targetValue"),
                (Failure, "roll > targetValue"),
                (Extreme, "roll <= targetValue / 5"),
                (Hard, "roll <= targetValue / 2"),
                (Success, "roll <= targetValue"),
            ]),
        },
        RollDeciderConfig {
            id: "coc2".into(),
            name: "COC 规则书".into(),
            description: "成功率 < 50 时出 96-100 大失败，否则出 100 大失败；出 1 大成功".into(),
            rules: rules(&[
                (Worst, "baseValue < 50 ? roll >= 96 : roll == 100"),
                (Best, "roll == 1"),
                (Failure, "roll > targetValue"),
                (Extreme, "roll <= targetValue / 5"),
                (Hard, "roll <= targetValue / 2"),
                (Success, "roll <= targetValue"),
            ]),
        },
        RollDeciderConfig {
            id: "dnd0".into(),
            name: "DND 默认规则".into(),
            description: "d20 出 20 大成功，出 1 大失败，≥ DC 成功".into(),
            rules: rules(&[
                (Worst, "firstD20 == 1"),
                (Best, "firstD20 == 20"),
                (Success, "roll >= targetValue"),
                (Failure, "roll < targetValue"),
            ]),
        },
    ]
}
