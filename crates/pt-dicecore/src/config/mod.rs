//! Per-channel configuration.
//!
//! A [`ChannelConfig`] is plain serde data with a version number. Older
//! payloads are upgraded in place by [`ChannelConfig::migrate`], and
//! [`ChannelConfig::sync_with_plugins`] keeps its item lists in step with the
//! loaded plugin set. Items defined inside the config itself live under the
//! reserved [`EMBED_PLUGIN_ID`](crate::plugin::EMBED_PLUGIN_ID) prefix and
//! are never purged by a sync.

pub mod resolved;
pub mod text;

pub use resolved::ResolvedConfig;
pub use text::{CustomTextConfig, DEFAULT_TEXTS_ID, TextItem, TextVars, default_texts};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::alias::{AliasRollConfig, embedded_aliases};
use crate::decider::{RollDeciderConfig, embedded_deciders};
use crate::error::{DiceError, DiceResult};
use crate::plugin::{FullId, HookKind, PluginProvider};

/// Current config payload version.
pub const CONFIG_VERSION: u32 = 3;

/// Emoji that re-rolls a message by default.
pub const DEFAULT_REACTION_EMOJI: &str = "🎲";

fn first_version() -> u32 {
    1
}

fn enabled() -> bool {
    true
}

fn default_decider() -> FullId {
    FullId::embed("coc0")
}

/// An enabled-or-not reference to a plugin item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigItemRef {
    /// Full id of the item.
    pub id: FullId,
    /// Whether the item is active in this channel.
    pub enabled: bool,
}

impl ConfigItemRef {
    /// Create a reference.
    pub fn new(id: FullId, enabled: bool) -> Self {
        Self { id, enabled }
    }
}

/// The roll used when a command carries no dice expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultRoll {
    /// Default expression for COC and general cards.
    pub expression: String,
    /// Default expression for DND cards.
    pub dnd_expression: String,
}

impl Default for DefaultRoll {
    fn default() -> Self {
        Self {
            expression: "d100".into(),
            dnd_expression: "d20".into(),
        }
    }
}

/// Reacting to a message with a trigger emoji rolls it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionTrigger {
    /// Whether reactions trigger rolls.
    #[serde(default = "enabled")]
    pub enabled: bool,
    /// Trigger emojis.
    #[serde(default)]
    pub emojis: Vec<String>,
}

impl Default for ReactionTrigger {
    fn default() -> Self {
        Self {
            enabled: true,
            emojis: vec![DEFAULT_REACTION_EMOJI.into()],
        }
    }
}

/// Switches for the special commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialDice {
    /// `sc` sanity checks.
    #[serde(default = "enabled")]
    pub sc: bool,
    /// `en` skill growth.
    #[serde(default = "enabled")]
    pub en: bool,
    /// `ri` / `init` initiative.
    #[serde(default = "enabled")]
    pub ri: bool,
    /// `st` card edits.
    #[serde(default = "enabled")]
    pub st: bool,
    /// `ds` death saves.
    #[serde(default = "enabled")]
    pub ds: bool,
    /// `nn` card linking.
    #[serde(default = "enabled")]
    pub nn: bool,
    /// `pc` card management.
    #[serde(default = "enabled")]
    pub pc: bool,
    /// Opposed rolls by reply.
    #[serde(default = "enabled")]
    pub opposed: bool,
    /// `[[..]]` inline rolls in plain messages.
    #[serde(default = "enabled")]
    pub in_message: bool,
    /// Reaction trigger.
    #[serde(default)]
    pub reaction: ReactionTrigger,
}

impl Default for SpecialDice {
    fn default() -> Self {
        Self {
            sc: true,
            en: true,
            ri: true,
            st: true,
            ds: true,
            nn: true,
            pc: true,
            opposed: true,
            in_message: true,
            reaction: ReactionTrigger::default(),
        }
    }
}

/// Definitions stored in the config itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedPlugin {
    /// Deciders.
    #[serde(default)]
    pub rules: Vec<RollDeciderConfig>,
    /// Alias rules.
    #[serde(default)]
    pub alias_rolls: Vec<AliasRollConfig>,
    /// Text sets.
    #[serde(default)]
    pub custom_texts: Vec<CustomTextConfig>,
}

impl Default for EmbedPlugin {
    fn default() -> Self {
        Self {
            rules: embedded_deciders(),
            alias_rolls: embedded_aliases(),
            custom_texts: vec![default_texts().clone()],
        }
    }
}

/// Settings of one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    /// Payload version.
    #[serde(default = "first_version")]
    pub version: u32,
    /// Default roll expressions.
    #[serde(default)]
    pub default_roll: DefaultRoll,
    /// Special-command switches.
    #[serde(default)]
    pub special_dice: SpecialDice,
    /// Decider for COC and general cards.
    #[serde(default = "default_decider")]
    pub decider_id: FullId,
    /// Decider for DND cards.
    #[serde(default)]
    pub dnd_decider_id: Option<FullId>,
    /// Alias rules, in trial order.
    #[serde(default)]
    pub alias_roll_ids: Vec<ConfigItemRef>,
    /// Text sets; later sets override earlier ones.
    #[serde(default)]
    pub custom_text_ids: Vec<ConfigItemRef>,
    /// Hooks per kind, in execution order.
    #[serde(default)]
    pub hook_ids: BTreeMap<HookKind, Vec<ConfigItemRef>>,
    /// Definitions owned by the config.
    #[serde(default)]
    pub embed_plugin: EmbedPlugin,
    /// Plugin preference values by plugin id.
    #[serde(default)]
    pub plugins: BTreeMap<String, BTreeMap<String, String>>,
    /// Time of the last change.
    #[serde(default = "Utc::now")]
    pub last_modified: DateTime<Utc>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        let embed = EmbedPlugin::default();
        let alias_roll_ids = embed
            .alias_rolls
            .iter()
            .map(|a| ConfigItemRef::new(FullId::embed(&a.id), a.default_enabled))
            .collect();
        Self {
            version: CONFIG_VERSION,
            default_roll: DefaultRoll::default(),
            special_dice: SpecialDice::default(),
            decider_id: default_decider(),
            dnd_decider_id: Some(FullId::embed("dnd0")),
            alias_roll_ids,
            custom_text_ids: vec![ConfigItemRef::new(FullId::embed(DEFAULT_TEXTS_ID), true)],
            hook_ids: HookKind::ALL.iter().map(|k| (*k, Vec::new())).collect(),
            embed_plugin: embed,
            plugins: BTreeMap::new(),
            last_modified: Utc::now(),
        }
    }
}

impl ChannelConfig {
    /// Deserialize and migrate a config.
    pub fn from_json(json: &str) -> DiceResult<Self> {
        let mut config: ChannelConfig = serde_json::from_str(json)?;
        config.migrate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> DiceResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Upgrade to [`CONFIG_VERSION`] in place. Returns whether anything was
    /// upgraded; the current version is left untouched.
    pub fn migrate(&mut self) -> DiceResult<bool> {
        if self.version > CONFIG_VERSION {
            return Err(DiceError::UnsupportedVersion {
                kind: "config",
                found: self.version,
                supported: CONFIG_VERSION,
            });
        }
        if self.version == CONFIG_VERSION {
            return Ok(false);
        }
        let from = self.version;
        if self.version < 2 {
            self.migrate_v2();
        }
        if self.version < 3 {
            self.migrate_v3();
        }
        self.touch();
        info!(target: "dicecore::config", from, to = CONFIG_VERSION, "config migrated");
        Ok(true)
    }

    // v2: per-kind hook lists and a separate DND decider.
    fn migrate_v2(&mut self) {
        for kind in HookKind::ALL {
            self.hook_ids.entry(kind).or_default();
        }
        for decider in embedded_deciders() {
            if !self.embed_plugin.rules.iter().any(|r| r.id == decider.id) {
                self.embed_plugin.rules.push(decider);
            }
        }
        if self.dnd_decider_id.is_none() {
            self.dnd_decider_id = Some(FullId::embed("dnd0"));
        }
        self.version = 2;
    }

    // v3: embedded text set and the reaction trigger.
    fn migrate_v3(&mut self) {
        let texts = &mut self.embed_plugin.custom_texts;
        if !texts.iter().any(|t| t.id == DEFAULT_TEXTS_ID) {
            texts.insert(0, default_texts().clone());
        }
        let id = FullId::embed(DEFAULT_TEXTS_ID);
        if !self.custom_text_ids.iter().any(|r| r.id == id) {
            self.custom_text_ids.insert(0, ConfigItemRef::new(id, true));
        }
        if self.special_dice.reaction.emojis.is_empty() {
            self.special_dice.reaction = ReactionTrigger::default();
        }
        self.version = 3;
    }

    /// Bump `last_modified`.
    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }

    /// Reconcile item lists with the loaded plugins. Returns whether
    /// anything changed.
    pub fn sync_with_plugins(&mut self, plugins: &PluginProvider) -> bool {
        let mut changed = sync_refs(&mut self.alias_roll_ids, &plugins.alias_ids());
        changed |= sync_refs(&mut self.custom_text_ids, &plugins.text_ids());
        for kind in HookKind::ALL {
            let refs = self.hook_ids.entry(kind).or_default();
            changed |= sync_refs(refs, &plugins.hook_ids(kind));
        }
        if !self.decider_id.is_embed() && plugins.decider(&self.decider_id).is_none() {
            debug!(target: "dicecore::config", id = %self.decider_id, "decider vanished");
            self.decider_id = default_decider();
            changed = true;
        }
        let dnd_gone = self
            .dnd_decider_id
            .as_ref()
            .is_some_and(|id| !id.is_embed() && plugins.decider(id).is_none());
        if dnd_gone {
            self.dnd_decider_id = Some(FullId::embed("dnd0"));
            changed = true;
        }
        let before = self.plugins.len();
        self.plugins
            .retain(|plugin, _| plugins.plugin(plugin).is_some());
        changed |= before != self.plugins.len();
        if changed {
            self.touch();
        }
        changed
    }

    /// Set a plugin preference.
    pub fn set_preference(&mut self, plugin: &str, key: &str, value: impl Into<String>) {
        self.plugins
            .entry(plugin.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
        self.touch();
    }
}

/// Drop non-embedded refs missing from `available`, then append new ones.
fn sync_refs(refs: &mut Vec<ConfigItemRef>, available: &[(FullId, bool)]) -> bool {
    let before = refs.len();
    refs.retain(|r| r.id.is_embed() || available.iter().any(|(id, _)| *id == r.id));
    let mut changed = before != refs.len();
    for (id, default_enabled) in available {
        if !refs.iter().any(|r| r.id == *id) {
            refs.push(ConfigItemRef::new(id.clone(), *default_enabled));
            changed = true;
        }
    }
    changed
}

/// The default config plus lazily created per-channel copies.
#[derive(Debug, Clone, Default)]
pub struct ConfigProvider {
    default: ChannelConfig,
    configs: HashMap<String, ChannelConfig>,
}

impl ConfigProvider {
    /// A provider whose default is [`ChannelConfig::default`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` as the template for new channels.
    pub fn with_default(mut self, config: ChannelConfig) -> Self {
        self.default = config;
        self
    }

    /// The template for new channels.
    pub fn default_config(&self) -> &ChannelConfig {
        &self.default
    }

    /// The channel's config, or the default if it has none yet.
    pub fn config(&self, channel_id: &str) -> &ChannelConfig {
        self.configs.get(channel_id).unwrap_or(&self.default)
    }

    /// The channel's config, created from the default on first use.
    pub fn config_mut(&mut self, channel_id: &str) -> &mut ChannelConfig {
        let default = &self.default;
        self.configs
            .entry(channel_id.to_string())
            .or_insert_with(|| default.clone())
    }

    /// Load a channel's config from JSON, migrating it.
    pub fn load(&mut self, channel_id: &str, json: &str) -> DiceResult<()> {
        let config = ChannelConfig::from_json(json)?;
        self.configs.insert(channel_id.to_string(), config);
        Ok(())
    }

    /// The channel's config as JSON.
    pub fn export(&self, channel_id: &str) -> DiceResult<String> {
        self.config(channel_id).to_json()
    }

    /// Resync the default and every channel with the loaded plugins.
    pub fn sync_plugins(&mut self, plugins: &PluginProvider) {
        self.default.sync_with_plugins(plugins);
        for (channel, config) in &mut self.configs {
            if config.sync_with_plugins(plugins) {
                debug!(target: "dicecore::config", channel = %channel, "config resynced");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::{AliasScope, AliasTrigger};
    use crate::plugin::Plugin;

    fn plugin() -> Plugin {
        Plugin::new("io.example.more", "More")
            .with_alias(AliasRollConfig::new(
                "ra",
                AliasScope::Command,
                AliasTrigger::naive("ra", "r"),
            ))
            .with_alias(
                AliasRollConfig::new("off", AliasScope::Command, AliasTrigger::naive("off", "r"))
                    .with_default_enabled(false),
            )
            .with_texts(CustomTextConfig::new("loud", "Loud").with_text("roll.vs.draw", "平！"))
    }

    #[test]
    fn default_is_current() {
        let mut config = ChannelConfig::default();
        assert_eq!(config.version, CONFIG_VERSION);
        assert!(!config.migrate().unwrap());
        assert_eq!(config.alias_roll_ids.len(), 4);
        assert_eq!(config.hook_ids.len(), HookKind::ALL.len());
    }

    #[test]
    fn migrates_v1_and_is_idempotent() {
        let json = r#"{"version":1,"deciderId":"io.paotuan.embed.coc0","embedPlugin":{"rules":[],"customTexts":[]}}"#;
        let mut config = ChannelConfig::from_json(json).unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.dnd_decider_id, Some(FullId::embed("dnd0")));
        assert!(config.embed_plugin.rules.iter().any(|r| r.id == "dnd0"));
        assert_eq!(config.custom_text_ids.len(), 1);

        let snapshot = config.clone();
        assert!(!config.migrate().unwrap());
        assert_eq!(config, snapshot);
    }

    #[test]
    fn rejects_future_versions() {
        let json = r#"{"version":9}"#;
        assert!(matches!(
            ChannelConfig::from_json(json),
            Err(DiceError::UnsupportedVersion { kind: "config", .. })
        ));
    }

    #[test]
    fn plugin_add_then_remove() {
        let mut provider = PluginProvider::new();
        provider.register(vec![plugin()]);
        let mut config = ChannelConfig::default();
        assert!(config.sync_with_plugins(&provider));
        assert_eq!(config.alias_roll_ids.len(), 6);
        let added = config
            .alias_roll_ids
            .iter()
            .find(|r| r.id == FullId::new("io.example.more", "off"))
            .unwrap();
        assert!(!added.enabled);
        assert_eq!(config.custom_text_ids.len(), 2);
        assert!(!config.sync_with_plugins(&provider));

        provider.register(Vec::new());
        assert!(config.sync_with_plugins(&provider));
        assert_eq!(config.alias_roll_ids.len(), 4);
        assert!(config.alias_roll_ids.iter().all(|r| r.id.is_embed()));
        assert_eq!(config.custom_text_ids.len(), 1);
    }

    #[test]
    fn vanished_decider_falls_back() {
        let mut config = ChannelConfig {
            decider_id: FullId::new("io.example.gone", "x"),
            ..ChannelConfig::default()
        };
        config.sync_with_plugins(&PluginProvider::new());
        assert_eq!(config.decider_id, FullId::embed("coc0"));
    }

    #[test]
    fn provider_creates_channels_lazily() {
        let mut provider = ConfigProvider::new();
        assert_eq!(provider.config("c1").version, CONFIG_VERSION);
        provider.config_mut("c1").special_dice.sc = false;
        assert!(!provider.config("c1").special_dice.sc);
        assert!(provider.config("c2").special_dice.sc);
        let json = provider.export("c1").unwrap();
        provider.load("c3", &json).unwrap();
        assert!(!provider.config("c3").special_dice.sc);
    }
}
