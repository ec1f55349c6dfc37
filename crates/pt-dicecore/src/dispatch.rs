//! The engine: command and reaction entry points.
//!
//! [`DiceEngine`] owns every provider and the RNG. A host feeds it commands
//! and reactions, sends the resulting [`Roll`] output to the channel and
//! calls [`DiceEngine::apply_to_card`] once it wants changes committed.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use pt_dice::DiceRng;

use crate::alias::{self, AliasScope};
use crate::card::{Card, CardLinker, CardOps, CardProvider, CardType};
use crate::command::{Command, CommandContext, Reaction, strip_command_prefix};
use crate::config::{ChannelConfig, ConfigProvider, ResolvedConfig, SpecialDice, TextVars};
use crate::error::{DiceError, DiceResult};
use crate::initiative::InitiativeProvider;
use crate::plugin::{HostApi, Plugin, PluginProvider};
use crate::roll::{
    CardAdminRoll, CardEditRoll, DeathSaveRoll, GrowthRoll, InitiativeListRoll, InitiativeRoll,
    LinkRoll, OpposedCache, OpposedRoll, Roll, RollEnv, RollEvaluator, SanCheckRoll, StandardRoll,
    strip_keyword,
};
use crate::template::{self, InlineRoll, ParseSource, TemplateEnv};

/// How a command is evaluated.
enum Selection {
    /// A special command.
    Special(Box<dyn RollEvaluator>),
    /// A special command switched off in the channel config.
    Disabled(&'static str),
    /// Anything else.
    Standard,
}

fn select(text: &str, special: &SpecialDice) -> Selection {
    fn gate(enabled: bool, keyword: &'static str, evaluator: impl RollEvaluator + 'static) -> Selection {
        if enabled {
            Selection::Special(Box::new(evaluator))
        } else {
            Selection::Disabled(keyword)
        }
    }

    if let Some(rest) = strip_keyword(text, "sc") {
        return gate(special.sc, "sc", SanCheckRoll::new(rest));
    }
    if let Some(rest) = strip_keyword(text, "en") {
        return gate(special.en, "en", GrowthRoll::new(rest));
    }
    if let Some(rest) = strip_keyword(text, "ri") {
        return gate(special.ri, "ri", InitiativeRoll::new(rest));
    }
    if let Some(rest) = strip_keyword(text, "init") {
        return gate(special.ri, "init", InitiativeListRoll::new(rest));
    }
    if let Some(rest) = strip_keyword(text, "st") {
        return gate(special.st, "st", CardEditRoll::new(rest));
    }
    if strip_keyword(text, "ds").is_some() || strip_keyword(text, "死亡豁免").is_some() {
        return gate(special.ds, "ds", DeathSaveRoll::new());
    }
    if let Some(rest) = strip_keyword(text, "nn") {
        return gate(special.nn, "nn", LinkRoll::new(rest));
    }
    if let Some(rest) = strip_keyword(text, "pc") {
        return gate(special.pc, "pc", CardAdminRoll::new(rest));
    }
    Selection::Standard
}

/// Dice engine holding cards, configs, plugins and per-channel state.
pub struct DiceEngine {
    cards: CardProvider,
    configs: ConfigProvider,
    plugins: PluginProvider,
    initiative: InitiativeProvider,
    opposed: OpposedCache,
    rng: Box<dyn DiceRng>,
}

impl Default for DiceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DiceEngine {
    /// An empty engine seeded from the OS.
    pub fn new() -> Self {
        Self::with_rng(Box::new(StdRng::from_os_rng()))
    }

    /// An empty engine rolling with `rng`.
    pub fn with_rng(rng: Box<dyn DiceRng>) -> Self {
        Self {
            cards: CardProvider::new(),
            configs: ConfigProvider::new(),
            plugins: PluginProvider::new(),
            initiative: InitiativeProvider::new(),
            opposed: OpposedCache::new(),
            rng,
        }
    }

    /// An empty engine with a reproducible RNG.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(Box::new(StdRng::seed_from_u64(seed)))
    }

    /// Store card links through a host-supplied linker.
    pub fn with_linker(mut self, linker: Box<dyn CardLinker>) -> Self {
        self.cards = std::mem::take(&mut self.cards).with_linker(linker);
        self
    }

    /// Use `config` as the template for channels without their own config.
    pub fn with_default_config(mut self, config: ChannelConfig) -> Self {
        self.configs = std::mem::take(&mut self.configs).with_default(config);
        self.configs.sync_plugins(&self.plugins);
        self
    }

    /// Replace the loaded plugins and resync every config against them.
    pub fn register_plugins(&mut self, plugins: Vec<Plugin>) {
        info!(target: "dicecore::plugin", count = plugins.len(), "registering plugins");
        self.plugins.register(plugins);
        self.configs.sync_plugins(&self.plugins);
    }

    /// Live cards.
    pub fn cards(&self) -> &CardProvider {
        &self.cards
    }

    /// Live cards, mutably.
    pub fn cards_mut(&mut self) -> &mut CardProvider {
        &mut self.cards
    }

    /// Channel configs.
    pub fn configs(&self) -> &ConfigProvider {
        &self.configs
    }

    /// Channel configs, mutably.
    pub fn configs_mut(&mut self) -> &mut ConfigProvider {
        &mut self.configs
    }

    /// Loaded plugins.
    pub fn plugins(&self) -> &PluginProvider {
        &self.plugins
    }

    /// Initiative lists.
    pub fn initiative(&self) -> &InitiativeProvider {
        &self.initiative
    }

    /// Rolls open to opposed replies.
    pub fn opposed(&self) -> &OpposedCache {
        &self.opposed
    }

    /// The config of `channel_id` resolved against the loaded plugins.
    pub fn resolved(&self, channel_id: &str) -> ResolvedConfig<'_> {
        ResolvedConfig::new(self.configs.config(channel_id), &self.plugins)
    }

    /// Handle a command typed by a user.
    ///
    /// Returns `None` when a hook handled the command, the command is
    /// switched off for the channel, or evaluation failed. Failures are
    /// logged, never surfaced.
    pub async fn dispatch_command(&mut self, mut command: Command, host: &dyn HostApi) -> Option<Roll> {
        let hooks = self.resolved(&command.context.channel_id).receive_command_hooks();
        for hook in hooks {
            if hook.on_receive_command(&mut command, host).await {
                debug!(target: "dicecore::dispatch", command = %command.command, "handled by hook");
                return None;
            }
        }
        let roll = match self.evaluate(&command) {
            Ok(roll) => roll?,
            Err(e) => {
                warn!(target: "dicecore::dispatch", command = %command.command, error = %e, "command failed");
                return None;
            }
        };

        if let Some(private) = roll.private_output() {
            host.send_to_user(&command.context.user_id, private).await;
        }
        if let (true, Some(message_id)) = (roll.wants_opposed(), command.context.message_id.as_deref()) {
            self.register_opposed(&command.context.channel_id, message_id, &roll);
        }
        Some(roll)
    }

    fn evaluate(&mut self, command: &Command) -> DiceResult<Option<Roll>> {
        let context = &command.context;
        let config = ResolvedConfig::new(self.configs.config(&context.channel_id), &self.plugins);
        let mut history: Vec<InlineRoll> = Vec::new();
        let text = {
            let processors = config.alias_processors(AliasScope::Command);
            let card = self.cards.linked_card(&context.channel_id, &context.user_id);
            let mut tenv = TemplateEnv::new(context, &mut *self.rng).with_card(card);
            alias::resolve(command.command.trim(), &processors, &mut tenv, &mut history, 0)?
        };

        let evaluator: Box<dyn RollEvaluator> = match select(&text, config.special_dice()) {
            Selection::Special(evaluator) => evaluator,
            Selection::Disabled(keyword) => {
                debug!(target: "dicecore::dispatch", keyword, channel = %context.channel_id, "command disabled");
                return Ok(None);
            }
            Selection::Standard => {
                let standard = StandardRoll::new(text.clone(), history);
                let flavor = self
                    .cards
                    .linked_card(&context.channel_id, &context.user_id)
                    .map_or(CardType::General, CardOps::card_type);
                let prior = context
                    .reply_to
                    .as_deref()
                    .filter(|_| config.special_dice().opposed)
                    .and_then(|reply_to| self.opposed.get(&context.channel_id, reply_to))
                    .filter(|prior| prior.card_type == flavor);
                match prior {
                    Some(prior) => Box::new(OpposedRoll::new(standard, prior.clone())),
                    None => Box::new(standard),
                }
            }
        };

        let mut roll = Roll::new(text, context.clone(), evaluator);
        let mut env = RollEnv {
            context,
            config,
            cards: &mut self.cards,
            initiative: &mut self.initiative,
            rng: &mut *self.rng,
        };
        roll.roll(&mut env)?;
        info!(
            target: "dicecore::dispatch",
            kind = ?roll.kind(),
            user = %context.user_id,
            channel = %context.channel_id,
            "command rolled"
        );
        Ok(Some(roll))
    }

    /// Commit a roll's changes and notify `onCardEntryChange` hooks.
    ///
    /// Returns a copy of every card that changed.
    pub async fn apply_to_card(&mut self, roll: &mut Roll, host: &dyn HostApi) -> DiceResult<Vec<Card>> {
        let context = roll.context().clone();
        let changed = {
            let mut env = RollEnv {
                context: &context,
                config: ResolvedConfig::new(self.configs.config(&context.channel_id), &self.plugins),
                cards: &mut self.cards,
                initiative: &mut self.initiative,
                rng: &mut *self.rng,
            };
            roll.apply_to_card(&mut env)?
        };

        let changes = self.cards.drain_changes();
        if !changes.is_empty() {
            let hooks = self.resolved(&context.channel_id).card_change_hooks();
            for change in &changes {
                for hook in &hooks {
                    hook.on_card_entry_change(change, host).await;
                }
            }
        }

        let mut cards: Vec<Card> = Vec::new();
        for name in changed {
            if cards.iter().any(|c| c.name() == name) {
                continue;
            }
            if let Some(card) = self.cards.get(&name) {
                cards.push(card.clone());
            }
        }
        debug!(target: "dicecore::dispatch", cards = cards.len(), changes = changes.len(), "roll applied");
        Ok(cards)
    }

    /// Handle a reaction added to a message.
    ///
    /// `onMessageReaction` hooks run first; the first one that returns
    /// `true` ends handling. Otherwise a configured trigger emoji rolls the
    /// reacted message as the reacting user's command.
    pub async fn dispatch_reaction(&mut self, reaction: Reaction, host: &dyn HostApi) -> Option<Roll> {
        let channel_id = reaction.context.channel_id.clone();
        let hooks = self.resolved(&channel_id).reaction_hooks();
        for hook in hooks {
            if hook.on_message_reaction(&reaction, host).await {
                return None;
            }
        }

        let trigger = &self.configs.config(&channel_id).special_dice.reaction;
        if !trigger.enabled || !trigger.emojis.iter().any(|e| *e == reaction.emoji) {
            return None;
        }
        let content = host.fetch_message_content(&channel_id, &reaction.message_id).await?;
        let text = strip_command_prefix(&content).unwrap_or_else(|| content.trim());
        if text.is_empty() {
            return None;
        }
        debug!(target: "dicecore::dispatch", message = %reaction.message_id, "reaction trigger");
        let command = Command::new(text, reaction.context);
        self.dispatch_command(command, host).await
    }

    /// Record `roll` so later replies to `message_id` become opposed rolls.
    /// Returns whether the roll qualified.
    pub fn register_opposed(&mut self, channel_id: &str, message_id: &str, roll: &Roll) -> bool {
        let enabled = self.configs.config(channel_id).special_dice.opposed;
        match roll.opposed_snapshot() {
            Some(snapshot) if enabled => {
                self.opposed.insert(channel_id, message_id, snapshot);
                true
            }
            _ => false,
        }
    }

    /// Expand `[[...]]` inline rolls in a plain chat message.
    ///
    /// Returns `None` when the channel has inline rolls switched off or the
    /// message contains none.
    pub fn render_message(&mut self, text: &str, context: &CommandContext) -> DiceResult<Option<String>> {
        let config = ResolvedConfig::new(self.configs.config(&context.channel_id), &self.plugins);
        if !config.special_dice().in_message || !text.contains("[[") {
            return Ok(None);
        }
        let mut history = Vec::new();
        let message = {
            let card = self.cards.linked_card(&context.channel_id, &context.user_id);
            let mut tenv = TemplateEnv::new(context, &mut *self.rng).with_card(card);
            template::parse(text, &mut tenv, &mut history, ParseSource::Message, 0)?
        };
        if history.is_empty() {
            return Ok(None);
        }
        let name = self
            .cards
            .linked_name(&context.channel_id, &context.user_id)
            .unwrap_or_else(|| context.username.clone());
        let vars = TextVars::new()
            .with("用户名", &context.username)
            .with("人物卡名", name)
            .with("at用户", context.mention())
            .with("消息", message);
        Ok(Some(config.render("roll.message", &vars, &mut *self.rng)))
    }

    /// Load a channel's config from JSON and resync it with the plugins.
    pub fn load_config(&mut self, channel_id: &str, json: &str) -> DiceResult<()> {
        self.configs.load(channel_id, json)?;
        self.configs.config_mut(channel_id).sync_with_plugins(&self.plugins);
        Ok(())
    }

    /// Register a card from its JSON form, migrating older versions.
    pub fn load_card(&mut self, json: &str) -> DiceResult<String> {
        let mut card = Card::from_json(json)?;
        if card.migrate()? {
            debug!(target: "dicecore::card", name = card.name(), "card migrated");
        }
        let name = card.name().to_string();
        self.cards.register(card);
        Ok(name)
    }

    /// The JSON form of a registered card.
    pub fn export_card(&self, name: &str) -> DiceResult<String> {
        self.cards
            .get(name)
            .ok_or_else(|| DiceError::CardNotFound(name.to_string()))?
            .to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roll::RollKind;

    #[test]
    fn keywords_route_in_order() {
        let special = SpecialDice::default();
        let kind = |text: &str| match select(text, &special) {
            Selection::Special(evaluator) => Some(evaluator.kind()),
            _ => None,
        };
        assert_eq!(kind("sc 1/d3"), Some(RollKind::SanCheck));
        assert_eq!(kind("en"), Some(RollKind::Growth));
        assert_eq!(kind("ri +2 哥布林"), Some(RollKind::Initiative));
        assert_eq!(kind("init clr"), Some(RollKind::InitiativeList));
        assert_eq!(kind("st力量60"), Some(RollKind::CardEdit));
        assert_eq!(kind("死亡豁免"), Some(RollKind::DeathSave));
        assert_eq!(kind("nn Maca"), Some(RollKind::Link));
        assert_eq!(kind("pc list"), Some(RollKind::CardAdmin));
        assert_eq!(kind("d100 侦查"), None);
        assert_eq!(kind("stealth"), None);
    }

    #[test]
    fn disabled_commands_are_reported() {
        let special = SpecialDice {
            sc: false,
            ..SpecialDice::default()
        };
        assert!(matches!(select("sc 1/d3", &special), Selection::Disabled("sc")));
        assert!(matches!(select("rd100", &special), Selection::Standard));
    }

    #[test]
    fn inline_rolls_in_messages() {
        let mut engine = DiceEngine::with_rng(Box::new(pt_dice::FixedRng(3)));
        let context = CommandContext::new("u1", "Maca", "c1");
        let text = engine.render_message("攻击 [[d6+1]] 点", &context).unwrap();
        assert_eq!(text.as_deref(), Some("Maca 🎲 攻击 4 点"));
        assert_eq!(engine.render_message("没有掷骰", &context).unwrap(), None);

        let mut config = ChannelConfig::default();
        config.special_dice.in_message = false;
        let mut engine = DiceEngine::with_rng(Box::new(pt_dice::FixedRng(3))).with_default_config(config);
        assert_eq!(engine.render_message("[[d6]]", &context).unwrap(), None);
    }

    #[test]
    fn export_unknown_card_fails() {
        let engine = DiceEngine::with_seed(7);
        assert!(matches!(engine.export_card("Maca"), Err(DiceError::CardNotFound(_))));
    }
}
