//! Registry of live cards.

use std::collections::HashMap;
use tracing::debug;

use super::{Card, CardEntryChange, CardLinker, CardOps, InMemoryLinker};

/// Live cards by name, plus the link table.
pub struct CardProvider {
    cards: HashMap<String, Card>,
    linker: Box<dyn CardLinker>,
}

impl Default for CardProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CardProvider {
    /// An empty registry with in-memory links.
    pub fn new() -> Self {
        Self {
            cards: HashMap::new(),
            linker: Box::new(InMemoryLinker::new()),
        }
    }

    /// Use a host-supplied linker.
    pub fn with_linker(mut self, linker: Box<dyn CardLinker>) -> Self {
        self.linker = linker;
        self
    }

    /// Register a card, replacing any card with the same name.
    pub fn register(&mut self, card: Card) {
        debug!(target: "dicecore::card", name = card.name(), "register card");
        self.cards.insert(card.name().to_string(), card);
    }

    /// Remove a card and every link to it.
    pub fn unregister(&mut self, name: &str) -> Option<Card> {
        let card = self.cards.remove(name)?;
        self.linker.delete_card(name);
        debug!(target: "dicecore::card", name, "unregister card");
        Some(card)
    }

    /// Look up a card by name.
    pub fn get(&self, name: &str) -> Option<&Card> {
        self.cards.get(name)
    }

    /// Look up a card by name, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Card> {
        self.cards.get_mut(name)
    }

    /// Whether a card is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.cards.contains_key(name)
    }

    /// All card names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.cards.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Name of the card a user holds in a channel, if it is registered.
    pub fn linked_name(&self, channel_id: &str, user_id: &str) -> Option<String> {
        self.linker
            .linked_card(channel_id, user_id)
            .filter(|name| self.cards.contains_key(name))
    }

    /// The card a user holds in a channel.
    pub fn linked_card(&self, channel_id: &str, user_id: &str) -> Option<&Card> {
        let name = self.linker.linked_card(channel_id, user_id)?;
        self.cards.get(&name)
    }

    /// The card a user holds in a channel, mutably.
    pub fn linked_card_mut(&mut self, channel_id: &str, user_id: &str) -> Option<&mut Card> {
        let name = self.linker.linked_card(channel_id, user_id)?;
        self.cards.get_mut(&name)
    }

    /// Link or unlink a user's card in a channel.
    pub fn link(&mut self, channel_id: &str, user_id: &str, card: Option<&str>) {
        self.linker.link_card(channel_id, user_id, card);
    }

    /// Who holds `card` in `channel_id`.
    pub fn holder(&self, channel_id: &str, card: &str) -> Option<String> {
        self.linker.holder(channel_id, card)
    }

    /// The link table.
    pub fn linker(&self) -> &dyn CardLinker {
        self.linker.as_ref()
    }

    /// Cards whose name contains `keyword`, an exact match alone if there is one.
    pub fn search(&self, keyword: &str) -> Vec<&str> {
        if let Some((name, _)) = self.cards.get_key_value(keyword) {
            return vec![name.as_str()];
        }
        let lower = keyword.to_lowercase();
        let mut found: Vec<&str> = self
            .cards
            .keys()
            .filter(|name| name.to_lowercase().contains(&lower))
            .map(String::as_str)
            .collect();
        found.sort_unstable();
        found
    }

    /// Take recorded changes from every card.
    pub fn drain_changes(&mut self) -> Vec<CardEntryChange> {
        let mut names: Vec<&String> = self.cards.keys().collect();
        names.sort_unstable();
        let names: Vec<String> = names.into_iter().cloned().collect();
        let mut changes = Vec::new();
        for name in names {
            if let Some(card) = self.cards.get_mut(&name) {
                changes.extend(card.core_mut().drain_changes());
            }
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardType;

    fn provider() -> CardProvider {
        let mut cards = CardProvider::new();
        cards.register(Card::new(CardType::Coc, "Maca"));
        cards.register(Card::new(CardType::Coc, "Macabre"));
        cards.register(Card::new(CardType::Dnd, "Bruenor"));
        cards
    }

    #[test]
    fn search_prefers_exact_match() {
        let cards = provider();
        assert_eq!(cards.search("Maca"), vec!["Maca"]);
        assert_eq!(cards.search("mac"), vec!["Maca", "Macabre"]);
        assert!(cards.search("zzz").is_empty());

        // Results borrow the provider, not the keyword.
        let found = {
            let keyword = String::from("Maca");
            cards.search(&keyword)
        };
        assert_eq!(found, ["Maca"]);
    }

    #[test]
    fn unregister_cascades_links() {
        let mut cards = provider();
        cards.link("c1", "alice", Some("Maca"));
        assert_eq!(cards.linked_card("c1", "alice").unwrap().name(), "Maca");
        cards.unregister("Maca");
        assert!(cards.linked_card("c1", "alice").is_none());
        assert!(cards.linker().link_map().is_empty());
    }

    #[test]
    fn changes_are_drained_once() {
        let mut cards = provider();
        cards.get_mut("Maca").unwrap().set_entry("力量", 50);
        assert_eq!(cards.drain_changes().len(), 1);
        assert!(cards.drain_changes().is_empty());
    }
}
