//! Alias rules.
//!
//! An alias rewrites the start of a text. Naive triggers such as
//! `rb{{X=1}}` compile to an anchored regex with numeric named captures;
//! their replacers (`r{{X+1}}d%kl1`) hold expression slots evaluated over the
//! captures. Regex triggers use a raw pattern and either a `$name` template
//! or a plugin callback. Compiled patterns and replacers are cached by text.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{CompileCache, DEFAULT_ENTRIES};
use crate::command::CommandContext;
use crate::error::{DiceError, DiceResult};
use crate::expr::{self, CompiledExpr, Vars};
use crate::plugin::FullId;
use crate::template::{self, InlineRoll, ParseSource, TemplateEnv};

/// Deepest alias-of-alias chain before giving up.
pub const MAX_ALIAS_DEPTH: usize = 99;

static NAIVE_PATTERNS: Lazy<CompileCache<NaivePattern>> =
    Lazy::new(|| CompileCache::new(DEFAULT_ENTRIES));
static REGEX_PATTERNS: Lazy<CompileCache<Regex>> =
    Lazy::new(|| CompileCache::new(DEFAULT_ENTRIES));
static REPLACERS: Lazy<CompileCache<Replacer>> =
    Lazy::new(|| CompileCache::new(DEFAULT_ENTRIES));

/// Which text an alias applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AliasScope {
    /// The dice body of a standard roll.
    Expression,
    /// The whole command, before dispatch.
    Command,
}

/// How an alias matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AliasTrigger {
    /// Literal text with `{{X}}` / `{{X=1}}` numeric slots.
    Naive {
        /// The pattern.
        pattern: String,
        /// Replacement with `{{expr}}` slots.
        replacer: String,
    },
    /// A raw regex.
    Regex {
        /// The pattern, anchored at the start.
        pattern: String,
        /// `$name` expansion template. Without one a plugin callback is used.
        #[serde(default)]
        replacer: Option<String>,
    },
}

impl AliasTrigger {
    /// A naive trigger.
    pub fn naive(pattern: impl Into<String>, replacer: impl Into<String>) -> Self {
        AliasTrigger::Naive {
            pattern: pattern.into(),
            replacer: replacer.into(),
        }
    }

    /// A regex trigger with a template replacer.
    pub fn regex(pattern: impl Into<String>, replacer: Option<String>) -> Self {
        AliasTrigger::Regex {
            pattern: pattern.into(),
            replacer,
        }
    }
}

fn enabled() -> bool {
    true
}

/// An alias rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasRollConfig {
    /// Item id within the owning plugin.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Which text the rule applies to.
    pub scope: AliasScope,
    /// How the rule matches and rewrites.
    pub trigger: AliasTrigger,
    /// Whether new channels enable the rule.
    #[serde(default = "enabled")]
    pub default_enabled: bool,
}

impl AliasRollConfig {
    /// A default-enabled rule.
    pub fn new(id: impl Into<String>, scope: AliasScope, trigger: AliasTrigger) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            scope,
            trigger,
            default_enabled: true,
        }
    }

    /// Set the display name and description.
    pub fn with_description(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.name = name.into();
        self.description = description.into();
        self
    }

    /// Set whether new channels enable the rule.
    pub fn with_default_enabled(mut self, enabled: bool) -> Self {
        self.default_enabled = enabled;
        self
    }
}

/// Code replacer for regex triggers.
pub trait AliasCallback: Send + Sync {
    /// Produce the replacement, or `None` when the match cannot be rewritten.
    fn replace(&self, captures: &Captures<'_>, context: &CommandContext) -> Option<String>;
}

/// An enabled rule ready to be tried.
#[derive(Clone)]
pub struct AliasProcessor<'a> {
    /// Full id of the rule.
    pub id: FullId,
    /// The rule.
    pub config: &'a AliasRollConfig,
    /// Plugin callback, if any.
    pub callback: Option<&'a dyn AliasCallback>,
}

impl<'a> AliasProcessor<'a> {
    /// A processor without a callback.
    pub fn new(id: FullId, config: &'a AliasRollConfig) -> Self {
        Self {
            id,
            config,
            callback: None,
        }
    }

    /// Attach a callback.
    pub fn with_callback(mut self, callback: Option<&'a dyn AliasCallback>) -> Self {
        self.callback = callback;
        self
    }
}

/// The result of one expansion step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasExpansion {
    /// Rule that matched.
    pub id: FullId,
    /// Replacement for the matched prefix.
    pub expanded: String,
    /// Text after the matched prefix.
    pub rest: String,
    /// False when the replacer failed and `expanded` is the original prefix.
    pub replaced: bool,
}

struct NaivePattern {
    regex: Regex,
    defaults: Vec<(String, Option<String>)>,
}

enum Part {
    Text(String),
    Slot(CompiledExpr),
}

struct Replacer {
    parts: Vec<Part>,
}

impl Replacer {
    fn render(&self, vars: &Vars) -> DiceResult<String> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Text(text) => out.push_str(text),
                Part::Slot(slot) => out.push_str(&slot.eval(vars)?.to_string()),
            }
        }
        Ok(out)
    }
}

/// Split `text` into literal runs and `{{...}}` slot contents.
fn slots(text: &str) -> Vec<(bool, &str)> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find("{{") {
        let Some(len) = rest[open + 2..].find("}}") else {
            break;
        };
        if open > 0 {
            out.push((false, &rest[..open]));
        }
        out.push((true, rest[open + 2..open + 2 + len].trim()));
        rest = &rest[open + 2 + len + 2..];
    }
    if !rest.is_empty() {
        out.push((false, rest));
    }
    out
}

fn compile_naive(pattern: &str) -> DiceResult<NaivePattern> {
    let mut source = String::from("(?i)^");
    let mut defaults = Vec::new();
    for (is_slot, text) in slots(pattern) {
        if !is_slot {
            source.push_str(&regex::escape(text));
            continue;
        }
        let (name, default) = match text.split_once('=') {
            Some((name, default)) => (name.trim(), Some(default.trim().to_string())),
            None => (text, None),
        };
        let digits = if default.is_some() { r"\d*" } else { r"\d+" };
        source.push_str(&format!("(?P<{name}>{digits})"));
        defaults.push((name.to_string(), default));
    }
    Ok(NaivePattern {
        regex: Regex::new(&source)?,
        defaults,
    })
}

fn compile_replacer(replacer: &str) -> DiceResult<Replacer> {
    let parts = slots(replacer)
        .into_iter()
        .map(|(is_slot, text)| {
            if is_slot {
                Ok(Part::Slot(expr::compile(text, None)?))
            } else {
                Ok(Part::Text(text.to_string()))
            }
        })
        .collect::<DiceResult<Vec<_>>>()?;
    Ok(Replacer { parts })
}

fn compile_regex(pattern: &str) -> DiceResult<Regex> {
    let anchored = if pattern.starts_with('^') {
        pattern.to_string()
    } else {
        format!("^(?:{pattern})")
    };
    Ok(Regex::new(&anchored)?)
}

/// Compiled naive pattern, shared through the cache.
fn naive_pattern(pattern: &str) -> DiceResult<Arc<NaivePattern>> {
    NAIVE_PATTERNS.get_or_compile(pattern, || compile_naive(pattern))
}

fn naive_replace(
    pattern: &NaivePattern,
    captures: &Captures<'_>,
    replacer: &str,
) -> DiceResult<String> {
    let mut vars = Vars::new();
    for (name, default) in &pattern.defaults {
        let raw = captures
            .name(name)
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
            .or(default.as_deref())
            .unwrap_or("0");
        vars.insert(name.clone(), raw.parse().unwrap_or(0.0));
    }
    let replacer = REPLACERS.get_or_compile(replacer, || compile_replacer(replacer))?;
    replacer.render(&vars)
}

/// Try each processor against the start of `text`. The first structural
/// match wins even if its replacer fails.
pub fn expand_once(
    text: &str,
    processors: &[AliasProcessor<'_>],
    context: &CommandContext,
) -> Option<AliasExpansion> {
    for processor in processors {
        let step = match &processor.config.trigger {
            AliasTrigger::Naive { pattern, replacer } => {
                let compiled = match naive_pattern(pattern) {
                    Ok(compiled) => compiled,
                    Err(e) => {
                        warn!(target: "dicecore::alias", id = %processor.id, error = %e, "bad alias pattern");
                        continue;
                    }
                };
                let Some(captures) = compiled.regex.captures(text) else {
                    continue;
                };
                let replaced = naive_replace(&compiled, &captures, replacer);
                finish(processor, text, &captures, replaced.map(Some))
            }
            AliasTrigger::Regex { pattern, replacer } => {
                let compiled =
                    match REGEX_PATTERNS.get_or_compile(pattern, || compile_regex(pattern)) {
                        Ok(compiled) => compiled,
                        Err(e) => {
                            warn!(target: "dicecore::alias", id = %processor.id, error = %e, "bad alias pattern");
                            continue;
                        }
                    };
                let Some(captures) = compiled.captures(text) else {
                    continue;
                };
                let replaced = match (processor.callback, replacer) {
                    (Some(callback), _) => Ok(callback.replace(&captures, context)),
                    (None, Some(template)) => {
                        let mut out = String::new();
                        captures.expand(template, &mut out);
                        Ok(Some(out))
                    }
                    (None, None) => Ok(None),
                };
                finish(processor, text, &captures, replaced)
            }
        };
        return Some(step);
    }
    None
}

fn finish(
    processor: &AliasProcessor<'_>,
    text: &str,
    captures: &Captures<'_>,
    replaced: DiceResult<Option<String>>,
) -> AliasExpansion {
    let end = captures.get(0).map_or(0, |m| m.end());
    let (expanded, replaced) = match replaced {
        Ok(Some(expanded)) => (expanded, true),
        Ok(None) => (text[..end].to_string(), false),
        Err(e) => {
            warn!(target: "dicecore::alias", id = %processor.id, error = %e, "alias replacer failed");
            (text[..end].to_string(), false)
        }
    };
    AliasExpansion {
        id: processor.id.clone(),
        expanded,
        rest: text[end..].to_string(),
        replaced,
    }
}

/// Expand aliases at the start of `text` until none applies.
///
/// Each replacement is fed through the template parser and expanded again,
/// so an alias may produce another alias.
pub fn resolve(
    text: &str,
    processors: &[AliasProcessor<'_>],
    env: &mut TemplateEnv<'_>,
    history: &mut Vec<InlineRoll>,
    depth: usize,
) -> DiceResult<String> {
    if depth > MAX_ALIAS_DEPTH {
        return Err(DiceError::RecursionLimit(text.to_string()));
    }
    let Some(step) = expand_once(text, processors, env.context) else {
        return Ok(text.to_string());
    };
    if !step.replaced {
        return Ok(text.to_string());
    }
    debug!(target: "dicecore::alias", id = %step.id, expanded = %step.expanded, "alias applied");
    let parsed = template::parse(&step.expanded, env, history, ParseSource::Message, depth + 1)?;
    let head = resolve(&parsed, processors, env, history, depth + 1)?;
    Ok(head + &step.rest)
}

/// Alias rules shipped with the embedded pseudo-plugin.
pub fn embedded_aliases() -> Vec<AliasRollConfig> {
    vec![
        AliasRollConfig::new("rb", AliasScope::Command, AliasTrigger::naive("rb{{X=1}}", "r{{X+1}}d%kl1"))
            .with_description("奖励骰", "rb：一个奖励骰，rbX：X 个奖励骰"),
        AliasRollConfig::new("rp", AliasScope::Command, AliasTrigger::naive("rp{{X=1}}", "r{{X+1}}d%kh1"))
            .with_description("惩罚骰", "rp：一个惩罚骰，rpX：X 个惩罚骰"),
        AliasRollConfig::new("adv", AliasScope::Expression, AliasTrigger::naive("adv", "2d20kh1"))
            .with_description("优势", "adv：两个 d20 取高"),
        AliasRollConfig::new("dis", AliasScope::Expression, AliasTrigger::naive("dis", "2d20kl1"))
            .with_description("劣势", "dis：两个 d20 取低"),
    ]
}
