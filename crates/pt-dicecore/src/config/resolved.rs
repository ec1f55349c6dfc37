//! A channel config joined with the plugin registry.

use std::sync::Arc;

use pt_dice::DiceRng;

use crate::alias::{AliasProcessor, AliasScope};
use crate::card::CardType;
use crate::decider::RollDeciderConfig;
use crate::plugin::{
    CardEntryChangeHook, DiceRollHook, FullId, HookHandler, HookKind, MessageReactionHook,
    ParseDiceRollHook, PluginProvider, ReceiveCommandHook,
};

use super::text::{self, CustomTextConfig, TextItem, TextVars};
use super::{ChannelConfig, SpecialDice};

/// Everything a roll needs to know about its channel.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedConfig<'a> {
    config: &'a ChannelConfig,
    plugins: &'a PluginProvider,
}

impl<'a> ResolvedConfig<'a> {
    /// Join a config with the registry.
    pub fn new(config: &'a ChannelConfig, plugins: &'a PluginProvider) -> Self {
        Self { config, plugins }
    }

    /// The underlying config.
    pub fn config(&self) -> &'a ChannelConfig {
        self.config
    }

    /// Special-command switches.
    pub fn special_dice(&self) -> &'a SpecialDice {
        &self.config.special_dice
    }

    /// Default expression for a card flavor.
    pub fn default_expression(&self, flavor: CardType) -> &'a str {
        match flavor {
            CardType::Dnd => &self.config.default_roll.dnd_expression,
            CardType::Coc | CardType::General => &self.config.default_roll.expression,
        }
    }

    /// The active decider for a card flavor.
    pub fn decider(&self, flavor: CardType) -> Option<&'a RollDeciderConfig> {
        let id = match flavor {
            CardType::Dnd => self.config.dnd_decider_id.as_ref()?,
            CardType::Coc | CardType::General => &self.config.decider_id,
        };
        if id.is_embed() {
            self.config.embed_plugin.rules.iter().find(|r| r.id == id.item)
        } else {
            self.plugins.decider(id)
        }
    }

    /// Enabled alias rules of `scope`, in trial order.
    pub fn alias_processors(&self, scope: AliasScope) -> Vec<AliasProcessor<'a>> {
        self.config
            .alias_roll_ids
            .iter()
            .filter(|r| r.enabled)
            .filter_map(|r| {
                if r.id.is_embed() {
                    let config = self
                        .config
                        .embed_plugin
                        .alias_rolls
                        .iter()
                        .find(|a| a.id == r.id.item)?;
                    Some(AliasProcessor::new(r.id.clone(), config))
                } else {
                    let alias = self.plugins.alias(&r.id)?;
                    Some(
                        AliasProcessor::new(r.id.clone(), &alias.config)
                            .with_callback(alias.callback.as_deref()),
                    )
                }
            })
            .filter(|p| p.config.scope == scope)
            .collect()
    }

    fn text_set(&self, id: &FullId) -> Option<&'a CustomTextConfig> {
        if id.is_embed() {
            self.config
                .embed_plugin
                .custom_texts
                .iter()
                .find(|t| t.id == id.item)
        } else {
            self.plugins.texts(id)
        }
    }

    /// Candidates for a text key. Later enabled sets win; the built-in set
    /// is the last resort.
    pub fn text(&self, key: &str) -> Option<&'a [TextItem]> {
        self.config
            .custom_text_ids
            .iter()
            .rev()
            .filter(|r| r.enabled)
            .filter_map(|r| self.text_set(&r.id))
            .chain(std::iter::once(text::default_texts()))
            .find_map(|set| set.texts.get(key))
            .filter(|items| !items.is_empty())
            .map(Vec::as_slice)
    }

    /// Render a text key. Unknown keys render as empty.
    pub fn render(&self, key: &str, vars: &TextVars, rng: &mut dyn DiceRng) -> String {
        self.text(key)
            .and_then(|items| text::pick(items, rng))
            .map(|item| text::render(&item.text, vars))
            .unwrap_or_default()
    }

    /// A plugin preference, falling back to the plugin's declared default.
    pub fn preference(&self, plugin: &str, key: &str) -> Option<&'a str> {
        self.config
            .plugins
            .get(plugin)
            .and_then(|prefs| prefs.get(key))
            .map(String::as_str)
            .or_else(|| {
                self.plugins
                    .plugin(plugin)?
                    .preferences
                    .iter()
                    .find(|p| p.key == key)
                    .map(|p| p.default_value.as_str())
            })
    }

    /// Enabled hook handlers of `kind`, in config order.
    pub fn hooks(&self, kind: HookKind) -> Vec<&'a HookHandler> {
        let Some(refs) = self.config.hook_ids.get(&kind) else {
            return Vec::new();
        };
        refs.iter()
            .filter(|r| r.enabled)
            .filter_map(|r| self.plugins.hook(&r.id))
            .map(|hook| &hook.handler)
            .filter(|handler| handler.kind() == kind)
            .collect()
    }

    /// `onReceiveCommand` handlers.
    pub fn receive_command_hooks(&self) -> Vec<Arc<dyn ReceiveCommandHook>> {
        self.hooks(HookKind::ReceiveCommand)
            .into_iter()
            .filter_map(|h| match h {
                HookHandler::ReceiveCommand(hook) => Some(Arc::clone(hook)),
                _ => None,
            })
            .collect()
    }

    /// `beforeParseDiceRoll` handlers.
    pub fn parse_hooks(&self) -> Vec<Arc<dyn ParseDiceRollHook>> {
        self.hooks(HookKind::BeforeParseDiceRoll)
            .into_iter()
            .filter_map(|h| match h {
                HookHandler::BeforeParseDiceRoll(hook) => Some(Arc::clone(hook)),
                _ => None,
            })
            .collect()
    }

    /// `onCardEntryChange` handlers.
    pub fn card_change_hooks(&self) -> Vec<Arc<dyn CardEntryChangeHook>> {
        self.hooks(HookKind::CardEntryChange)
            .into_iter()
            .filter_map(|h| match h {
                HookHandler::CardEntryChange(hook) => Some(Arc::clone(hook)),
                _ => None,
            })
            .collect()
    }

    /// `onMessageReaction` handlers.
    pub fn reaction_hooks(&self) -> Vec<Arc<dyn MessageReactionHook>> {
        self.hooks(HookKind::MessageReaction)
            .into_iter()
            .filter_map(|h| match h {
                HookHandler::MessageReaction(hook) => Some(Arc::clone(hook)),
                _ => None,
            })
            .collect()
    }

    /// `beforeDiceRoll` or `afterDiceRoll` handlers.
    pub fn dice_roll_hooks(&self, kind: HookKind) -> Vec<Arc<dyn DiceRollHook>> {
        self.hooks(kind)
            .into_iter()
            .filter_map(|h| match h {
                HookHandler::BeforeDiceRoll(hook) | HookHandler::AfterDiceRoll(hook) => {
                    Some(Arc::clone(hook))
                }
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigItemRef;
    use crate::decider::{DeciderRule, SuccessLevel};
    use crate::plugin::{Plugin, PluginHook};
    use pt_dice::FixedRng;

    struct Noop;

    impl DiceRollHook for Noop {
        fn on_dice_roll(&self, _roll: &mut crate::roll::StandardRollState) {}
    }

    fn plugin() -> Plugin {
        Plugin::new("io.example", "Example")
            .with_decider(RollDeciderConfig {
                id: "always".into(),
                name: "Always".into(),
                description: String::new(),
                rules: vec![DeciderRule::new(SuccessLevel::Best, "true")],
            })
            .with_texts(CustomTextConfig::new("short", "Short").with_text("test.success", "过"))
            .with_hook(PluginHook::new("noop", HookHandler::AfterDiceRoll(Arc::new(Noop))))
            .with_preference("mode", "Mode", "loud")
    }

    #[test]
    fn embedded_deciders_resolve_by_flavor() {
        let config = ChannelConfig::default();
        let plugins = PluginProvider::new();
        let resolved = ResolvedConfig::new(&config, &plugins);
        assert_eq!(resolved.decider(CardType::Coc).unwrap().id, "coc0");
        assert_eq!(resolved.decider(CardType::Dnd).unwrap().id, "dnd0");
        assert_eq!(resolved.default_expression(CardType::Dnd), "d20");
    }

    #[test]
    fn plugin_items_resolve_after_sync() {
        let mut plugins = PluginProvider::new();
        plugins.register(vec![plugin()]);
        let mut config = ChannelConfig::default();
        config.sync_with_plugins(&plugins);
        config.decider_id = FullId::new("io.example", "always");
        let resolved = ResolvedConfig::new(&config, &plugins);
        assert_eq!(resolved.decider(CardType::Coc).unwrap().id, "always");
        assert_eq!(resolved.dice_roll_hooks(HookKind::AfterDiceRoll).len(), 1);
        assert!(resolved.dice_roll_hooks(HookKind::BeforeDiceRoll).is_empty());
        assert_eq!(resolved.preference("io.example", "mode"), Some("loud"));
    }

    #[test]
    fn later_text_sets_override() {
        let mut plugins = PluginProvider::new();
        plugins.register(vec![plugin()]);
        let mut config = ChannelConfig::default();
        config.sync_with_plugins(&plugins);
        let resolved = ResolvedConfig::new(&config, &plugins);
        let mut rng = FixedRng(1);
        assert_eq!(resolved.render("test.success", &TextVars::new(), &mut rng), "过");
        assert_eq!(resolved.render("test.failure", &TextVars::new(), &mut rng), "失败");

        config.custom_text_ids = vec![ConfigItemRef::new(FullId::new("io.example", "short"), false)];
        let resolved = ResolvedConfig::new(&config, &plugins);
        assert_eq!(resolved.render("test.success", &TextVars::new(), &mut rng), "成功");
    }

    #[test]
    fn alias_processors_filter_scope() {
        let config = ChannelConfig::default();
        let plugins = PluginProvider::new();
        let resolved = ResolvedConfig::new(&config, &plugins);
        assert_eq!(resolved.alias_processors(AliasScope::Command).len(), 2);
        assert_eq!(resolved.alias_processors(AliasScope::Expression).len(), 2);
    }
}
