//! Plugins and their registry.
//!
//! A plugin bundles deciders, alias rules, custom text sets, hooks and
//! preference declarations. Loading plugin files is the host's job; the
//! engine receives already-built [`Plugin`] values and flattens them into
//! lookup tables keyed by [`FullId`].

pub mod hooks;
pub mod host;
pub mod id;

pub use hooks::{
    CardEntryChangeHook, DiceRollHook, HookHandler, HookKind, MessageReactionHook,
    ParseDiceRollHook, PluginHook, ReceiveCommandHook,
};
pub use host::{HostApi, NoopHost};
pub use id::{EMBED_PLUGIN_ID, FullId};

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::alias::{AliasCallback, AliasRollConfig};
use crate::config::CustomTextConfig;
use crate::decider::RollDeciderConfig;

/// An alias rule, optionally with a code replacer.
#[derive(Clone)]
pub struct PluginAlias {
    /// The rule.
    pub config: AliasRollConfig,
    /// Replacer used instead of the rule's template, for regex triggers.
    pub callback: Option<Arc<dyn AliasCallback>>,
}

impl std::fmt::Debug for PluginAlias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginAlias")
            .field("config", &self.config)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl From<AliasRollConfig> for PluginAlias {
    fn from(config: AliasRollConfig) -> Self {
        Self {
            config,
            callback: None,
        }
    }
}

/// A user-tunable plugin setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceItem {
    /// Preference key.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Value used when the channel has not set one.
    pub default_value: String,
}

/// A loaded plugin.
#[derive(Debug, Clone)]
pub struct Plugin {
    /// Unique id, e.g. `io.paotuan.plugin.cocrules`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Plugin version.
    pub version: u32,
    /// Contributed deciders.
    pub roll_deciders: Vec<RollDeciderConfig>,
    /// Contributed alias rules.
    pub alias_rolls: Vec<PluginAlias>,
    /// Contributed text sets.
    pub custom_texts: Vec<CustomTextConfig>,
    /// Contributed hooks.
    pub hooks: Vec<PluginHook>,
    /// Declared preferences.
    pub preferences: Vec<PreferenceItem>,
}

impl Plugin {
    /// An empty plugin.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: 1,
            roll_deciders: Vec::new(),
            alias_rolls: Vec::new(),
            custom_texts: Vec::new(),
            hooks: Vec::new(),
            preferences: Vec::new(),
        }
    }

    /// Set the version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Add a decider.
    pub fn with_decider(mut self, decider: RollDeciderConfig) -> Self {
        self.roll_deciders.push(decider);
        self
    }

    /// Add an alias rule.
    pub fn with_alias(mut self, alias: impl Into<PluginAlias>) -> Self {
        self.alias_rolls.push(alias.into());
        self
    }

    /// Add a text set.
    pub fn with_texts(mut self, texts: CustomTextConfig) -> Self {
        self.custom_texts.push(texts);
        self
    }

    /// Add a hook.
    pub fn with_hook(mut self, hook: PluginHook) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Declare a preference.
    pub fn with_preference(
        mut self,
        key: impl Into<String>,
        label: impl Into<String>,
        default_value: impl Into<String>,
    ) -> Self {
        self.preferences.push(PreferenceItem {
            key: key.into(),
            label: label.into(),
            default_value: default_value.into(),
        });
        self
    }

    fn full_id(&self, item: &str) -> FullId {
        FullId::new(self.id.clone(), item)
    }
}

/// The loaded plugin set, flattened into id-addressable tables.
#[derive(Debug, Default)]
pub struct PluginProvider {
    plugins: Vec<Plugin>,
    deciders: HashMap<FullId, RollDeciderConfig>,
    aliases: HashMap<FullId, PluginAlias>,
    texts: HashMap<FullId, CustomTextConfig>,
    hooks: HashMap<FullId, PluginHook>,
}

impl PluginProvider {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole plugin set.
    pub fn register(&mut self, plugins: Vec<Plugin>) {
        self.deciders.clear();
        self.aliases.clear();
        self.texts.clear();
        self.hooks.clear();
        for plugin in &plugins {
            for decider in &plugin.roll_deciders {
                self.deciders
                    .insert(plugin.full_id(&decider.id), decider.clone());
            }
            for alias in &plugin.alias_rolls {
                self.aliases
                    .insert(plugin.full_id(&alias.config.id), alias.clone());
            }
            for texts in &plugin.custom_texts {
                self.texts.insert(plugin.full_id(&texts.id), texts.clone());
            }
            for hook in &plugin.hooks {
                self.hooks.insert(plugin.full_id(&hook.id), hook.clone());
            }
        }
        info!(
            target: "dicecore::plugin",
            plugins = plugins.len(),
            deciders = self.deciders.len(),
            aliases = self.aliases.len(),
            texts = self.texts.len(),
            hooks = self.hooks.len(),
            "plugins registered"
        );
        self.plugins = plugins;
    }

    /// Loaded plugins in registration order.
    pub fn plugins(&self) -> &[Plugin] {
        &self.plugins
    }

    /// A plugin by id.
    pub fn plugin(&self, id: &str) -> Option<&Plugin> {
        self.plugins.iter().find(|p| p.id == id)
    }

    /// A contributed decider.
    pub fn decider(&self, id: &FullId) -> Option<&RollDeciderConfig> {
        self.deciders.get(id)
    }

    /// A contributed alias rule.
    pub fn alias(&self, id: &FullId) -> Option<&PluginAlias> {
        self.aliases.get(id)
    }

    /// A contributed text set.
    pub fn texts(&self, id: &FullId) -> Option<&CustomTextConfig> {
        self.texts.get(id)
    }

    /// A contributed hook.
    pub fn hook(&self, id: &FullId) -> Option<&PluginHook> {
        self.hooks.get(id)
    }

    /// Ids and default-enabled flags of every alias rule, in plugin order.
    pub fn alias_ids(&self) -> Vec<(FullId, bool)> {
        self.plugins
            .iter()
            .flat_map(|p| {
                p.alias_rolls
                    .iter()
                    .map(move |a| (p.full_id(&a.config.id), a.config.default_enabled))
            })
            .collect()
    }

    /// Ids and default-enabled flags of every text set, in plugin order.
    pub fn text_ids(&self) -> Vec<(FullId, bool)> {
        self.plugins
            .iter()
            .flat_map(|p| {
                p.custom_texts
                    .iter()
                    .map(move |t| (p.full_id(&t.id), t.default_enabled))
            })
            .collect()
    }

    /// Ids and default-enabled flags of every hook of `kind`, in plugin order.
    pub fn hook_ids(&self, kind: HookKind) -> Vec<(FullId, bool)> {
        self.plugins
            .iter()
            .flat_map(|p| {
                p.hooks
                    .iter()
                    .filter(move |h| h.kind() == kind)
                    .map(move |h| (p.full_id(&h.id), h.default_enabled))
            })
            .collect()
    }

    /// Whether `id` names an item this registry can resolve.
    pub fn contains(&self, id: &FullId) -> bool {
        self.deciders.contains_key(id)
            || self.aliases.contains_key(id)
            || self.texts.contains_key(id)
            || self.hooks.contains_key(id)
    }
}
