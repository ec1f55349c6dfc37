//! Opposed rolls: a standard roll made in reply to an earlier one.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

use crate::card::CardType;
use crate::decider::SuccessLevel;
use crate::error::DiceResult;

use super::{RollEnv, RollEvaluator, RollKind, StandardRoll};

/// Registered rolls kept per channel.
pub const MAX_OPPOSED_PER_CHANNEL: usize = 20;

/// What a reply is compared against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpposedSnapshot {
    /// Who made the roll.
    pub user_id: String,
    /// Their display name.
    pub username: String,
    /// Game system of their card.
    pub card_type: CardType,
    /// The single skill tested.
    pub skill: String,
    /// Decided level, if any.
    pub level: Option<SuccessLevel>,
    /// Value rolled against.
    pub target: i64,
    /// Roll total.
    pub total: i64,
    /// Rendered roll, e.g. `d100: [30] = 30`.
    pub output: String,
}

/// Rolls open to opposed replies, by channel and message id.
#[derive(Debug, Clone, Default)]
pub struct OpposedCache {
    channels: HashMap<String, VecDeque<(String, OpposedSnapshot)>>,
}

impl OpposedCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `snapshot` under `message_id`, evicting the oldest entry of
    /// the channel when it is full.
    pub fn insert(&mut self, channel_id: &str, message_id: &str, snapshot: OpposedSnapshot) {
        let queue = self.channels.entry(channel_id.to_string()).or_default();
        queue.retain(|(id, _)| id != message_id);
        if queue.len() >= MAX_OPPOSED_PER_CHANNEL {
            queue.pop_front();
        }
        queue.push_back((message_id.to_string(), snapshot));
    }

    /// The roll registered under `message_id`.
    pub fn get(&self, channel_id: &str, message_id: &str) -> Option<&OpposedSnapshot> {
        self.channels
            .get(channel_id)?
            .iter()
            .find(|(id, _)| id == message_id)
            .map(|(_, snapshot)| snapshot)
    }

    /// Number of rolls registered in a channel.
    pub fn channel_len(&self, channel_id: &str) -> usize {
        self.channels.get(channel_id).map_or(0, VecDeque::len)
    }
}

/// Compare the replying roll against the prior one. `Greater` means the
/// reply wins.
pub fn compare(reply: &OpposedSnapshot, prior: &OpposedSnapshot) -> Ordering {
    match reply.card_type {
        CardType::Dnd => reply.total.cmp(&prior.total),
        CardType::Coc | CardType::General => (reply.level, reply.target).cmp(&(prior.level, prior.target)),
    }
}

/// A standard roll judged against an earlier one.
#[derive(Debug, Clone)]
pub struct OpposedRoll {
    inner: StandardRoll,
    prior: OpposedSnapshot,
    output: String,
}

impl OpposedRoll {
    /// Reply to `prior` with `inner`.
    pub fn new(inner: StandardRoll, prior: OpposedSnapshot) -> Self {
        Self {
            inner,
            prior,
            output: String::new(),
        }
    }

    /// The roll being answered.
    pub fn prior(&self) -> &OpposedSnapshot {
        &self.prior
    }
}

impl RollEvaluator for OpposedRoll {
    fn kind(&self) -> RollKind {
        RollKind::Opposed
    }

    fn roll(&mut self, env: &mut RollEnv<'_>) -> DiceResult<()> {
        self.inner.roll(env)?;
        let mut output = self.inner.output().to_string();
        let Some(reply) = self.inner.opposed_snapshot() else {
            self.output = output;
            return Ok(());
        };
        let prior = &self.prior;
        let base = env.vars();
        let prior_level = prior
            .level
            .map(|level| env.render(level.text_key(), &base))
            .unwrap_or_default();
        let vars = base
            .with("对方用户名", &prior.username)
            .with("对方技能", &prior.skill)
            .with("对方掷骰结果", &prior.output)
            .with("对方目标值", prior.target)
            .with("对方判定", prior_level);
        let key = match compare(&reply, prior) {
            Ordering::Greater => "roll.vs.win",
            Ordering::Less => "roll.vs.lose",
            Ordering::Equal => "roll.vs.draw",
        };
        output.push('\n');
        output.push_str(&env.render("roll.vs.prior", &vars));
        output.push('\n');
        output.push_str(&env.render(key, &vars));
        self.output = output;
        Ok(())
    }

    fn output(&self) -> &str {
        &self.output
    }

    fn apply(&mut self, env: &mut RollEnv<'_>) -> DiceResult<Vec<String>> {
        self.inner.apply(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(user: &str, level: Option<SuccessLevel>, target: i64, total: i64) -> OpposedSnapshot {
        OpposedSnapshot {
            user_id: user.into(),
            username: user.into(),
            card_type: CardType::Coc,
            skill: "侦查".into(),
            level,
            target,
            total,
            output: format!("d100: [{total}] = {total}"),
        }
    }

    #[test]
    fn coc_compares_level_then_value() {
        let hard = snapshot("a", Some(SuccessLevel::Hard), 40, 15);
        let plain = snapshot("b", Some(SuccessLevel::Success), 70, 50);
        assert_eq!(compare(&hard, &plain), Ordering::Greater);
        let plain_low = snapshot("c", Some(SuccessLevel::Success), 40, 30);
        assert_eq!(compare(&plain_low, &plain), Ordering::Less);
        assert_eq!(compare(&plain, &plain.clone()), Ordering::Equal);
    }

    #[test]
    fn dnd_compares_totals() {
        let mut a = snapshot("a", None, 0, 15);
        let mut b = snapshot("b", None, 0, 12);
        a.card_type = CardType::Dnd;
        b.card_type = CardType::Dnd;
        assert_eq!(compare(&a, &b), Ordering::Greater);
    }

    #[test]
    fn cache_is_bounded_per_channel() {
        let mut cache = OpposedCache::new();
        for i in 0..MAX_OPPOSED_PER_CHANNEL + 5 {
            cache.insert("c1", &i.to_string(), snapshot("a", None, 0, 1));
        }
        assert_eq!(cache.channel_len("c1"), MAX_OPPOSED_PER_CHANNEL);
        assert!(cache.get("c1", "0").is_none());
        assert!(cache.get("c1", "24").is_some());
        assert!(cache.get("c2", "24").is_none());
    }
}
