//! End-to-end tests through `DiceEngine`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pt_dice::{FixedRng, SequenceRng};
use pt_dicecore::plugin::{
    CardEntryChangeHook, HookHandler, HookKind, MessageReactionHook, PluginHook, ReceiveCommandHook,
};
use pt_dicecore::roll::RollKind;
use pt_dicecore::{
    Card, CardEntryChange, CardOps, CardType, ChangedValue, ChannelConfig, Command, CommandContext,
    DiceEngine, DiceError, HostApi, NoopHost, Plugin, Reaction, RollPhase, UserRole,
};

#[derive(Default)]
struct RecordingHost {
    private: Mutex<Vec<(String, String)>>,
    messages: HashMap<String, String>,
}

#[async_trait]
impl HostApi for RecordingHost {
    async fn send_to_user(&self, user_id: &str, message: &str) {
        self.private
            .lock()
            .unwrap()
            .push((user_id.to_string(), message.to_string()));
    }

    async fn fetch_message_content(&self, _channel_id: &str, message_id: &str) -> Option<String> {
        self.messages.get(message_id).cloned()
    }
}

fn investigator(name: &str, spot: i64) -> Card {
    let mut card = Card::new(CardType::Coc, name);
    card.set_entry("力量", 60);
    card.set_entry("侦查", spot);
    card.set_entry("图书馆使用", 70);
    card.set_entry("理智", 60);
    card
}

fn maca() -> CommandContext {
    CommandContext::new("u1", "Maca", "c1")
}

fn engine(face: u32) -> DiceEngine {
    let mut engine = DiceEngine::with_rng(Box::new(FixedRng(face)));
    engine.cards_mut().register(investigator("Maca", 40));
    engine.cards_mut().link("c1", "u1", Some("Maca"));
    engine.cards_mut().drain_changes();
    engine
}

async fn output(engine: &mut DiceEngine, text: &str) -> String {
    let roll = engine
        .dispatch_command(Command::new(text, maca()), &NoopHost)
        .await
        .expect("command should roll");
    roll.output().to_string()
}

#[tokio::test]
async fn skill_check_against_linked_card() {
    let mut engine = engine(2);
    assert_eq!(output(&mut engine, "d100 侦察").await, "Maca 🎲 侦察 d100: [2] = 2 / 40 成功");
    insta::assert_snapshot!(output(&mut engine, "侦察 图书馆").await, @r"
    Maca 🎲 侦察 图书馆 d100: [2] = 2
    侦察 2 / 40 成功
    图书馆 2 / 70 成功
    ");
}

#[tokio::test]
async fn sanity_check_applies_to_the_card() {
    let mut engine = engine(2);
    let changes = Arc::new(Mutex::new(Vec::new()));
    engine.register_plugins(vec![Plugin::new("test.audit", "Audit").with_hook(PluginHook::new(
        "log",
        HookHandler::CardEntryChange(Arc::new(Audit(Arc::clone(&changes)))),
    ))]);

    let mut roll = engine
        .dispatch_command(Command::new("sc 1/d3", maca()), &NoopHost)
        .await
        .unwrap();
    assert_eq!(roll.kind(), RollKind::SanCheck);
    assert!(roll.output().ends_with("理智变化：60 → 59"), "{}", roll.output());

    let cards = engine.apply_to_card(&mut roll, &NoopHost).await.unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].get_entry("理智").map(|e| e.value), Some(59));
    assert_eq!(
        *changes.lock().unwrap(),
        [CardEntryChange {
            card_name: "Maca".into(),
            key: "理智".into(),
            value: ChangedValue::Entry { old: Some(60), new: 59 },
        }]
    );
}

fn audited(engine: &mut DiceEngine) -> Arc<Mutex<Vec<CardEntryChange>>> {
    let changes = Arc::new(Mutex::new(Vec::new()));
    engine.register_plugins(vec![Plugin::new("test.audit", "Audit").with_hook(PluginHook::new(
        "log",
        HookHandler::CardEntryChange(Arc::new(Audit(Arc::clone(&changes)))),
    ))]);
    changes
}

#[tokio::test]
async fn ability_edits_reach_card_change_hooks() {
    let mut engine = engine(2);
    let changes = audited(&mut engine);

    let mut roll = engine
        .dispatch_command(Command::new("st &徒手=1d3", maca()), &NoopHost)
        .await
        .unwrap();
    let cards = engine.apply_to_card(&mut roll, &NoopHost).await.unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(
        *changes.lock().unwrap(),
        [CardEntryChange {
            card_name: "Maca".into(),
            key: "徒手".into(),
            value: ChangedValue::Ability { old: None, new: "1d3".into() },
        }]
    );

    // Same expression again: nothing to report.
    let mut roll = engine
        .dispatch_command(Command::new("st &徒手=1d3", maca()), &NoopHost)
        .await
        .unwrap();
    assert!(engine.apply_to_card(&mut roll, &NoopHost).await.unwrap().is_empty());
    assert_eq!(changes.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn growth_marks_reach_card_change_hooks() {
    let mut engine = engine(2);
    let changes = audited(&mut engine);

    let mut roll = engine
        .dispatch_command(Command::new("d100 侦察", maca()), &NoopHost)
        .await
        .unwrap();
    engine.apply_to_card(&mut roll, &NoopHost).await.unwrap();
    assert_eq!(
        *changes.lock().unwrap(),
        [CardEntryChange {
            card_name: "Maca".into(),
            key: "侦查".into(),
            value: ChangedValue::GrowthMark { marked: true },
        }]
    );
}

#[tokio::test]
async fn apply_happens_once() {
    let mut engine = engine(2);
    let mut roll = engine
        .dispatch_command(Command::new("sc 1/d3 60", maca()), &NoopHost)
        .await
        .unwrap();
    let first = roll.output().to_string();
    assert!(engine.apply_to_card(&mut roll, &NoopHost).await.unwrap().is_empty());
    assert_eq!(roll.phase(), RollPhase::Applied);
    assert_eq!(roll.output(), first);
    assert!(matches!(
        engine.apply_to_card(&mut roll, &NoopHost).await,
        Err(DiceError::InvalidPhase(_))
    ));
    let card = engine.cards().get("Maca").unwrap();
    assert_eq!(card.get_entry("理智").map(|e| e.value), Some(60));
}

#[tokio::test]
async fn failures_are_swallowed() {
    let mut engine = engine(2);
    engine.cards_mut().get_mut("Maca").unwrap().set_ability("loop", "$loop");
    let roll = engine
        .dispatch_command(Command::new("r $loop", maca()), &NoopHost)
        .await;
    assert!(roll.is_none());
}

#[tokio::test]
async fn command_aliases_expand_first() {
    let mut engine = engine(2);
    let roll = engine
        .dispatch_command(Command::new("rb 侦察", maca()), &NoopHost)
        .await
        .unwrap();
    assert_eq!(roll.command(), "r2d%kl1 侦察");
    assert_eq!(roll.kind(), RollKind::Standard);
}

#[tokio::test]
async fn hidden_rolls_whisper_the_result() {
    let mut engine = engine(7);
    let host = RecordingHost::default();
    let roll = engine
        .dispatch_command(Command::new("rh d100", maca()), &host)
        .await
        .unwrap();
    assert_eq!(roll.output(), "Maca 在帷幕后面偷偷地 🎲，猜猜结果是什么");
    assert_eq!(
        *host.private.lock().unwrap(),
        [("u1".to_string(), "Maca 🎲 d100: [7] = 7".to_string())]
    );
}

#[tokio::test]
async fn disabled_commands_do_nothing() {
    let mut config = ChannelConfig::default();
    config.special_dice.sc = false;
    let mut engine = engine(2).with_default_config(config);
    let roll = engine
        .dispatch_command(Command::new("sc 1/d3", maca()), &NoopHost)
        .await;
    assert!(roll.is_none());
    assert_eq!(output(&mut engine, "d100").await, "Maca 🎲 d100: [2] = 2");
}

#[tokio::test]
async fn opposed_reply_compares_against_the_first_roll() {
    let mut engine = engine(2);
    engine.cards_mut().register(investigator("Lae", 70));
    engine.cards_mut().link("c1", "u2", Some("Lae"));

    let first = engine
        .dispatch_command(Command::new("rv 侦察", maca().with_message_id("m1")), &NoopHost)
        .await
        .unwrap();
    assert!(first.wants_opposed());
    assert!(engine.opposed().get("c1", "m1").is_some());

    let kay = CommandContext::new("u2", "Kay", "c1").with_reply_to("m1");
    let reply = engine
        .dispatch_command(Command::new("侦察", kay), &NoopHost)
        .await
        .unwrap();
    assert_eq!(reply.kind(), RollKind::Opposed);
    insta::assert_snapshot!(reply.output(), @r"
    Kay 🎲 侦察 d100: [2] = 2 / 70 成功
    Maca 🎲 侦察 d100: [2] = 2 / 40 成功
    Kay 胜出！
    ");
}

#[tokio::test]
async fn opposed_needs_matching_card_types() {
    let mut engine = engine(2);
    engine.cards_mut().register(Card::new(CardType::Dnd, "Tav"));
    engine.cards_mut().link("c1", "u2", Some("Tav"));
    engine
        .dispatch_command(Command::new("rv 侦察", maca().with_message_id("m1")), &NoopHost)
        .await
        .unwrap();
    let reply = engine
        .dispatch_command(
            Command::new("d20", CommandContext::new("u2", "Kay", "c1").with_reply_to("m1")),
            &NoopHost,
        )
        .await
        .unwrap();
    assert_eq!(reply.kind(), RollKind::Standard);
}

struct Audit(Arc<Mutex<Vec<CardEntryChange>>>);

#[async_trait]
impl CardEntryChangeHook for Audit {
    async fn on_card_entry_change(&self, change: &CardEntryChange, _host: &dyn HostApi) {
        self.0.lock().unwrap().push(change.clone());
    }
}

struct Mute;

#[async_trait]
impl ReceiveCommandHook for Mute {
    async fn on_receive_command(&self, command: &mut Command, _host: &dyn HostApi) -> bool {
        if command.command.starts_with("mute") {
            return true;
        }
        command.command = command.command.replace("侦查力", "侦察");
        false
    }
}

#[tokio::test]
async fn receive_hooks_can_handle_or_rewrite() {
    let mut engine = engine(2);
    engine.register_plugins(vec![
        Plugin::new("test.mute", "Mute").with_hook(PluginHook::new("mute", HookHandler::ReceiveCommand(Arc::new(Mute)))),
    ]);
    let refs = &engine.configs().config("c1").hook_ids[&HookKind::ReceiveCommand];
    assert_eq!(refs.len(), 1);

    let roll = engine
        .dispatch_command(Command::new("mute d100", maca()), &NoopHost)
        .await;
    assert!(roll.is_none());
    assert_eq!(output(&mut engine, "d100 侦查力").await, "Maca 🎲 侦察 d100: [2] = 2 / 40 成功");
}

#[tokio::test]
async fn plugins_are_replaced_wholesale() {
    let mut engine = engine(2);
    engine.register_plugins(vec![
        Plugin::new("test.mute", "Mute").with_hook(PluginHook::new("mute", HookHandler::ReceiveCommand(Arc::new(Mute)))),
    ]);
    engine.register_plugins(Vec::new());
    assert!(engine.configs().config("c1").hook_ids[&HookKind::ReceiveCommand].is_empty());
    assert!(
        engine
            .dispatch_command(Command::new("mute d100", maca()), &NoopHost)
            .await
            .is_some()
    );
}

struct Swallow;

#[async_trait]
impl MessageReactionHook for Swallow {
    async fn on_message_reaction(&self, reaction: &Reaction, _host: &dyn HostApi) -> bool {
        reaction.emoji == "👀"
    }
}

fn reaction(emoji: &str) -> Reaction {
    Reaction {
        context: CommandContext::new("u2", "Kay", "c1"),
        message_id: "m9".into(),
        emoji: emoji.into(),
    }
}

#[tokio::test]
async fn reactions_roll_the_message() {
    let mut engine = DiceEngine::with_rng(Box::new(SequenceRng::new(vec![3, 5])));
    let host = RecordingHost {
        messages: HashMap::from([("m9".to_string(), ".r 2d6 伤害".to_string())]),
        ..RecordingHost::default()
    };
    let emoji = ChannelConfig::default().special_dice.reaction.emojis[0].clone();
    let roll = engine.dispatch_reaction(reaction(&emoji), &host).await.unwrap();
    assert_eq!(roll.output(), "Kay 🎲 伤害 2d6: [3, 5] = 8");
    assert_eq!(roll.context().user_id, "u2");

    assert!(engine.dispatch_reaction(reaction("🙃"), &host).await.is_none());
}

#[tokio::test]
async fn reaction_hooks_short_circuit() {
    let mut engine = DiceEngine::with_rng(Box::new(FixedRng(3)));
    engine.register_plugins(vec![
        Plugin::new("test.swallow", "Swallow")
            .with_hook(PluginHook::new("eyes", HookHandler::MessageReaction(Arc::new(Swallow)))),
    ]);
    let mut config = ChannelConfig::default();
    config.special_dice.reaction.emojis.push("👀".into());
    engine.configs_mut().config_mut("c1").special_dice = config.special_dice;
    let host = RecordingHost {
        messages: HashMap::from([("m9".to_string(), "d6".to_string())]),
        ..RecordingHost::default()
    };
    assert!(engine.dispatch_reaction(reaction("👀"), &host).await.is_none());
}

#[tokio::test]
async fn card_commands_end_to_end() {
    let mut engine = engine(4);
    let admin = CommandContext::new("u3", "GM", "c1").with_role(UserRole::Admin);

    let mut roll = engine
        .dispatch_command(Command::new("pc new dnd Tav", admin.clone()), &NoopHost)
        .await
        .unwrap();
    engine.apply_to_card(&mut roll, &NoopHost).await.unwrap();
    assert_eq!(engine.cards().linked_name("c1", "u3").as_deref(), Some("Tav"));

    let mut roll = engine
        .dispatch_command(Command::new("st 敏捷14", admin.clone()), &NoopHost)
        .await
        .unwrap();
    let cards = engine.apply_to_card(&mut roll, &NoopHost).await.unwrap();
    assert_eq!(cards[0].card_type(), CardType::Dnd);
    assert_eq!(cards[0].get_entry("敏捷").map(|e| e.value), Some(14));

    let mut roll = engine
        .dispatch_command(Command::new("ri", admin.clone()), &NoopHost)
        .await
        .unwrap();
    engine.apply_to_card(&mut roll, &NoopHost).await.unwrap();
    assert_eq!(roll.output(), "Tav 🎲 先攻 d20+2: [4]+2 = 6");
    assert_eq!(engine.initiative().list("c1")[0].seq, 6);

    let mut roll = engine
        .dispatch_command(Command::new("nn tav", maca()), &NoopHost)
        .await
        .unwrap();
    engine.apply_to_card(&mut roll, &NoopHost).await.unwrap();
    assert_eq!(roll.output(), "Maca 没有操作人物卡 Tav 的权限");
    assert_eq!(engine.cards().linked_name("c1", "u1").as_deref(), Some("Maca"));
}
