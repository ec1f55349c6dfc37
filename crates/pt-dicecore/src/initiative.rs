//! Per-channel initiative lists.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;

/// Who an initiative entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiKind {
    /// A player, keyed by user id.
    Actor,
    /// A named non-player, keyed by name.
    Npc,
}

/// One entry of an initiative list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiItem {
    /// Player or non-player.
    pub kind: RiKind,
    /// User id for actors, name for non-players.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Initiative value.
    pub seq: i64,
    /// Tie breaker.
    pub seq2: i64,
}

impl RiItem {
    /// An entry for a player.
    pub fn actor(user_id: impl Into<String>, name: impl Into<String>, seq: i64) -> Self {
        Self {
            kind: RiKind::Actor,
            id: user_id.into(),
            name: name.into(),
            seq,
            seq2: 0,
        }
    }

    /// An entry for a non-player.
    pub fn npc(name: impl Into<String>, seq: i64) -> Self {
        let name = name.into();
        Self {
            kind: RiKind::Npc,
            id: name.clone(),
            name,
            seq,
            seq2: 0,
        }
    }

    /// Set the tie breaker.
    pub fn with_seq2(mut self, seq2: i64) -> Self {
        self.seq2 = seq2;
        self
    }
}

/// Initiative lists by channel, highest first.
#[derive(Debug, Clone, Default)]
pub struct InitiativeProvider {
    lists: HashMap<String, Vec<RiItem>>,
}

impl InitiativeProvider {
    /// No lists.
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel's list, sorted by `seq` then `seq2`, both descending.
    pub fn list(&self, channel_id: &str) -> &[RiItem] {
        self.lists.get(channel_id).map_or(&[], Vec::as_slice)
    }

    /// Insert an entry, replacing any entry with the same kind and id.
    pub fn upsert(&mut self, channel_id: &str, item: RiItem) {
        let list = self.lists.entry(channel_id.to_string()).or_default();
        list.retain(|i| !(i.kind == item.kind && i.id == item.id));
        list.push(item);
        list.sort_by_key(|i| (Reverse(i.seq), Reverse(i.seq2)));
    }

    /// Drop a channel's list.
    pub fn clear(&mut self, channel_id: &str) {
        self.lists.remove(channel_id);
    }

    /// Remove entries by display name. Returns how many were removed.
    pub fn remove(&mut self, channel_id: &str, names: &[String]) -> usize {
        let Some(list) = self.lists.get_mut(channel_id) else {
            return 0;
        };
        let before = list.len();
        list.retain(|i| !names.contains(&i.name));
        before - list.len()
    }
}
