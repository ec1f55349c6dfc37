//! Dice command engine for tabletop chat bots.
//!
//! Interprets chat commands such as `r d100 侦查`, `sc 1/d3` or
//! `st 力量60` against character cards (COC, DND and free-form), with
//! per-channel configuration, plugin-supplied deciders, alias rules, text
//! sets and hooks. Hosts drive everything through [`DiceEngine`].

pub mod alias;
pub mod cache;
pub mod card;
pub mod command;
pub mod config;
pub mod decider;
pub mod dispatch;
pub mod error;
pub mod expr;
pub mod initiative;
pub mod plugin;
pub mod roll;
pub mod template;

pub use card::{Card, CardEntryChange, CardLinker, CardOps, CardProvider, CardType, ChangedValue};
pub use command::{Command, CommandContext, Reaction, UserRole};
pub use config::{ChannelConfig, ConfigProvider, ResolvedConfig};
pub use decider::{RollDeciderConfig, SuccessLevel};
pub use dispatch::DiceEngine;
pub use error::{DiceError, DiceResult};
pub use initiative::{InitiativeProvider, RiItem};
pub use plugin::{FullId, HostApi, NoopHost, Plugin, PluginProvider};
pub use roll::{Roll, RollEvaluator, RollKind, RollPhase};
