//! The six hook points.
//!
//! Handlers are stored as a tagged [`HookHandler`] so one registry can hold
//! every kind. Async kinds take the host bundle; sync kinds run inside the
//! template parser and the standard roll and only see local state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::card::CardEntryChange;
use crate::command::{Command, CommandContext, Reaction};
use crate::roll::StandardRollState;

use super::HostApi;

/// Where in the pipeline a hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HookKind {
    /// Before a command is dispatched. Returning true stops dispatch.
    #[serde(rename = "onReceiveCommand")]
    ReceiveCommand,
    /// Before the template parser expands an expression.
    #[serde(rename = "beforeParseDiceRoll")]
    BeforeParseDiceRoll,
    /// After a card value is committed.
    #[serde(rename = "onCardEntryChange")]
    CardEntryChange,
    /// When a reaction is added to a message. Returning true stops the
    /// default dice trigger.
    #[serde(rename = "onMessageReaction")]
    MessageReaction,
    /// Before a standard roll evaluates its dice.
    #[serde(rename = "beforeDiceRoll")]
    BeforeDiceRoll,
    /// After a standard roll evaluates its dice.
    #[serde(rename = "afterDiceRoll")]
    AfterDiceRoll,
}

impl HookKind {
    /// Every kind, in pipeline order.
    pub const ALL: [HookKind; 6] = [
        HookKind::ReceiveCommand,
        HookKind::BeforeParseDiceRoll,
        HookKind::CardEntryChange,
        HookKind::MessageReaction,
        HookKind::BeforeDiceRoll,
        HookKind::AfterDiceRoll,
    ];

    /// Wire name of the kind.
    pub fn as_str(self) -> &'static str {
        match self {
            HookKind::ReceiveCommand => "onReceiveCommand",
            HookKind::BeforeParseDiceRoll => "beforeParseDiceRoll",
            HookKind::CardEntryChange => "onCardEntryChange",
            HookKind::MessageReaction => "onMessageReaction",
            HookKind::BeforeDiceRoll => "beforeDiceRoll",
            HookKind::AfterDiceRoll => "afterDiceRoll",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sees every command first.
#[async_trait]
pub trait ReceiveCommandHook: Send + Sync {
    /// May rewrite the command. Return true when the command was fully handled.
    async fn on_receive_command(&self, command: &mut Command, host: &dyn HostApi) -> bool;
}

/// Rewrites a top-level command expression before template expansion.
pub trait ParseDiceRollHook: Send + Sync {
    /// Rewrite `expression` in place.
    fn before_parse(&self, context: &CommandContext, expression: &mut String);
}

/// Observes committed card changes.
#[async_trait]
pub trait CardEntryChangeHook: Send + Sync {
    /// Called once per change.
    async fn on_card_entry_change(&self, change: &CardEntryChange, host: &dyn HostApi);
}

/// Sees reactions before the default dice trigger.
#[async_trait]
pub trait MessageReactionHook: Send + Sync {
    /// Return true when the reaction was handled.
    async fn on_message_reaction(&self, reaction: &Reaction, host: &dyn HostApi) -> bool;
}

/// Wraps evaluation of a standard roll.
pub trait DiceRollHook: Send + Sync {
    /// Inspect or adjust the roll. Before evaluation `rolls` is empty.
    fn on_dice_roll(&self, roll: &mut StandardRollState);
}

/// A hook implementation tagged with its kind.
#[derive(Clone)]
pub enum HookHandler {
    /// `onReceiveCommand`.
    ReceiveCommand(Arc<dyn ReceiveCommandHook>),
    /// `beforeParseDiceRoll`.
    BeforeParseDiceRoll(Arc<dyn ParseDiceRollHook>),
    /// `onCardEntryChange`.
    CardEntryChange(Arc<dyn CardEntryChangeHook>),
    /// `onMessageReaction`.
    MessageReaction(Arc<dyn MessageReactionHook>),
    /// `beforeDiceRoll`.
    BeforeDiceRoll(Arc<dyn DiceRollHook>),
    /// `afterDiceRoll`.
    AfterDiceRoll(Arc<dyn DiceRollHook>),
}

impl HookHandler {
    /// The kind this handler serves.
    pub fn kind(&self) -> HookKind {
        match self {
            HookHandler::ReceiveCommand(_) => HookKind::ReceiveCommand,
            HookHandler::BeforeParseDiceRoll(_) => HookKind::BeforeParseDiceRoll,
            HookHandler::CardEntryChange(_) => HookKind::CardEntryChange,
            HookHandler::MessageReaction(_) => HookKind::MessageReaction,
            HookHandler::BeforeDiceRoll(_) => HookKind::BeforeDiceRoll,
            HookHandler::AfterDiceRoll(_) => HookKind::AfterDiceRoll,
        }
    }
}

impl fmt::Debug for HookHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HookHandler({})", self.kind())
    }
}

/// A hook contributed by a plugin.
#[derive(Debug, Clone)]
pub struct PluginHook {
    /// Item id within the plugin.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Whether new channels enable it.
    pub default_enabled: bool,
    /// The implementation.
    pub handler: HookHandler,
}

impl PluginHook {
    /// A default-enabled hook.
    pub fn new(id: impl Into<String>, handler: HookHandler) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            default_enabled: true,
            handler,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set whether new channels enable the hook.
    pub fn with_default_enabled(mut self, enabled: bool) -> Self {
        self.default_enabled = enabled;
        self
    }

    /// Kind of the wrapped handler.
    pub fn kind(&self) -> HookKind {
        self.handler.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct Upper;

    impl ParseDiceRollHook for Upper {
        fn before_parse(&self, _context: &CommandContext, expression: &mut String) {
            *expression = expression.to_uppercase();
        }
    }

    #[test]
    fn kinds_use_wire_names() {
        let json = serde_json::to_string(&HookKind::BeforeParseDiceRoll).unwrap();
        assert_eq!(json, "\"beforeParseDiceRoll\"");
        for kind in HookKind::ALL {
            let back: HookKind =
                serde_json::from_str(&format!("\"{}\"", kind.as_str())).unwrap();
            assert_eq!(back, kind);
        }
    }

    #[test]
    fn kinds_work_as_map_keys() {
        let mut map = BTreeMap::new();
        map.insert(HookKind::AfterDiceRoll, 1);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"afterDiceRoll":1}"#);
        let back: BTreeMap<HookKind, i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[&HookKind::AfterDiceRoll], 1);
    }

    #[test]
    fn handler_reports_kind() {
        let hook = PluginHook::new("upper", HookHandler::BeforeParseDiceRoll(Arc::new(Upper)));
        assert_eq!(hook.kind(), HookKind::BeforeParseDiceRoll);
        assert!(hook.default_enabled);
        if let HookHandler::BeforeParseDiceRoll(h) = &hook.handler {
            let mut expr = "d100".to_string();
            h.before_parse(&CommandContext::default(), &mut expr);
            assert_eq!(expr, "D100");
        }
    }
}
