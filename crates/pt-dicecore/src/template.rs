//! Template expansion for dice expressions.
//!
//! Three passes run over an expression:
//!
//! 1. `${name}` / `$name` references. A card ability is expanded
//!    recursively and rolled as an inline roll; a card entry is replaced by
//!    its value. `${!name}` rolls the ability but substitutes nothing.
//!    Unknown names are left as written.
//! 2. Innermost `[[...]]` groups are rolled until none remain. Inside a
//!    group, `$1`, `$2`, ... refer to earlier groups of the same call.
//!    `[[!...]]` rolls without substituting.
//! 3. Remaining `$1`, `$2`, ... are replaced the same way.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

use pt_dice::{DiceRng, DiceRollResult};

use crate::card::{Card, CardOps};
use crate::command::CommandContext;
use crate::error::{DiceError, DiceResult};
use crate::plugin::ParseDiceRollHook;

/// Deepest nesting of ability references.
pub const MAX_TEMPLATE_DEPTH: usize = 99;

static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\$\{(?P<hidden>!?)(?P<braced>[^}]+)\}|\$(?P<bare>[^\s\d$+\-*/()\[\]{},，。!][^\s$+\-*/()\[\]{},，。]*)",
    )
    .expect("hardcoded regex")
});

static BACKREF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$(\d+)").expect("hardcoded regex"));

/// What is being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseSource {
    /// A command; `beforeParseDiceRoll` hooks run first.
    Command,
    /// A plain chat message or an internal re-parse; no hooks.
    Message,
}

/// A roll made while expanding a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineRoll {
    /// Ability key, for rolls made from `$name`.
    pub label: Option<String>,
    /// The roll.
    pub result: DiceRollResult,
    /// Whether the total was kept out of the text.
    pub hidden: bool,
}

/// Inputs shared across a template expansion.
pub struct TemplateEnv<'a> {
    /// Sender and channel.
    pub context: &'a CommandContext,
    /// Card that `$name` references resolve against.
    pub card: Option<&'a Card>,
    /// `beforeParseDiceRoll` handlers, in order.
    pub parse_hooks: Vec<Arc<dyn ParseDiceRollHook>>,
    /// Randomness for inline rolls.
    pub rng: &'a mut dyn DiceRng,
}

impl<'a> TemplateEnv<'a> {
    /// An environment without a card or hooks.
    pub fn new(context: &'a CommandContext, rng: &'a mut dyn DiceRng) -> Self {
        Self {
            context,
            card: None,
            parse_hooks: Vec::new(),
            rng,
        }
    }

    /// Resolve references against `card`.
    pub fn with_card(mut self, card: Option<&'a Card>) -> Self {
        self.card = card;
        self
    }

    /// Run these hooks before top-level command parses.
    pub fn with_parse_hooks(mut self, hooks: Vec<Arc<dyn ParseDiceRollHook>>) -> Self {
        self.parse_hooks = hooks;
        self
    }
}

/// Expand `expression`, appending every inline roll to `history`.
///
/// Parse hooks see only the top-level command text. Ability expressions
/// expanded at deeper levels come from the card and are not rewritten.
pub fn parse(
    expression: &str,
    env: &mut TemplateEnv<'_>,
    history: &mut Vec<InlineRoll>,
    source: ParseSource,
    depth: usize,
) -> DiceResult<String> {
    if depth > MAX_TEMPLATE_DEPTH {
        return Err(DiceError::RecursionLimit(expression.to_string()));
    }
    let mut text = expression.to_string();
    if depth == 0 && source == ParseSource::Command {
        for hook in &env.parse_hooks {
            hook.before_parse(env.context, &mut text);
        }
    }
    let text = expand_references(&text, env, history, source, depth)?;
    let mut local = Vec::new();
    let text = expand_inline_rolls(text, env, history, &mut local)?;
    Ok(substitute_backrefs(&text, &local))
}

fn expand_references(
    text: &str,
    env: &mut TemplateEnv<'_>,
    history: &mut Vec<InlineRoll>,
    source: ParseSource,
    depth: usize,
) -> DiceResult<String> {
    let Some(card) = env.card else {
        return Ok(text.to_string());
    };
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in REFERENCE.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let hidden = caps.name("hidden").is_some_and(|m| !m.as_str().is_empty());
        let name = caps
            .name("braced")
            .or_else(|| caps.name("bare"))
            .map_or("", |m| m.as_str().trim());
        out.push_str(&text[last..whole.start()]);
        last = whole.end();

        if let Some(ability) = card.get_ability(name) {
            let inner = parse(&ability.expression, env, history, source, depth + 1)?;
            let result = pt_dice::roll(&inner, env.rng)?;
            debug!(target: "dicecore::template", ability = %ability.key, output = %result, "ability rolled");
            if !hidden {
                out.push_str(&result.total.to_string());
            }
            history.push(InlineRoll {
                label: Some(ability.key),
                result,
                hidden,
            });
        } else if let Some(entry) = card.get_entry(name) {
            out.push_str(&entry.value.to_string());
        } else {
            out.push_str(whole.as_str());
        }
    }
    out.push_str(&text[last..]);
    Ok(out)
}

fn expand_inline_rolls(
    mut text: String,
    env: &mut TemplateEnv<'_>,
    history: &mut Vec<InlineRoll>,
    local: &mut Vec<i64>,
) -> DiceResult<String> {
    loop {
        let Some(close) = text.find("]]") else {
            break;
        };
        let Some(open) = text[..close].rfind("[[") else {
            break;
        };
        let inner = &text[open + 2..close];
        let (hidden, body) = match inner.strip_prefix('!') {
            Some(body) => (true, body),
            None => (false, inner),
        };
        let body = substitute_backrefs(body, local);
        let result = pt_dice::roll(&body, env.rng)?;
        let replacement = if hidden {
            String::new()
        } else {
            result.total.to_string()
        };
        local.push(result.total);
        history.push(InlineRoll {
            label: None,
            result,
            hidden,
        });
        text.replace_range(open..close + 2, &replacement);
    }
    Ok(text)
}

fn substitute_backrefs(text: &str, local: &[i64]) -> String {
    BACKREF
        .replace_all(text, |caps: &regex::Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| local.get(i))
                .map_or_else(|| caps[0].to_string(), i64::to_string)
        })
        .into_owned()
}
