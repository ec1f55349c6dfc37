//! Channel/user to card links.

use std::collections::{BTreeMap, HashMap};

/// A user holding a card in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardLink {
    /// Channel id.
    pub channel_id: String,
    /// User id.
    pub user_id: String,
}

/// Storage for card links, supplied by the host.
///
/// A card is held by at most one user per channel.
pub trait CardLinker: Send {
    /// Every link, grouped by card name.
    fn link_map(&self) -> BTreeMap<String, Vec<CardLink>>;

    /// The card a user holds in a channel.
    fn linked_card(&self, channel_id: &str, user_id: &str) -> Option<String>;

    /// Link a user to a card in a channel, or unlink with `None`. The card's
    /// previous holder in that channel is unlinked.
    fn link_card(&mut self, channel_id: &str, user_id: &str, card: Option<&str>);

    /// Remove every link to a card.
    fn delete_card(&mut self, card: &str);

    /// The user holding `card` in `channel_id`.
    fn holder(&self, channel_id: &str, card: &str) -> Option<String> {
        self.link_map()
            .remove(card)?
            .into_iter()
            .find(|link| link.channel_id == channel_id)
            .map(|link| link.user_id)
    }
}

/// Links kept in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLinker {
    links: HashMap<(String, String), String>,
}

impl InMemoryLinker {
    /// An empty link table.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CardLinker for InMemoryLinker {
    fn link_map(&self) -> BTreeMap<String, Vec<CardLink>> {
        let mut map: BTreeMap<String, Vec<CardLink>> = BTreeMap::new();
        for ((channel_id, user_id), card) in &self.links {
            map.entry(card.clone()).or_default().push(CardLink {
                channel_id: channel_id.clone(),
                user_id: user_id.clone(),
            });
        }
        for links in map.values_mut() {
            links.sort();
        }
        map
    }

    fn linked_card(&self, channel_id: &str, user_id: &str) -> Option<String> {
        self.links
            .get(&(channel_id.to_string(), user_id.to_string()))
            .cloned()
    }

    fn link_card(&mut self, channel_id: &str, user_id: &str, card: Option<&str>) {
        let key = (channel_id.to_string(), user_id.to_string());
        match card {
            Some(card) => {
                self.links
                    .retain(|(ch, _), held| !(ch == channel_id && held == card));
                self.links.insert(key, card.to_string());
            }
            None => {
                self.links.remove(&key);
            }
        }
    }

    fn delete_card(&mut self, card: &str) {
        self.links.retain(|_, held| held != card);
    }
}
