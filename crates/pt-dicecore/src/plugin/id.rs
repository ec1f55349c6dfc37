//! Composite ids for plugin-contributed items.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Plugin id reserved for definitions embedded in the channel config.
pub const EMBED_PLUGIN_ID: &str = "io.paotuan.embed";

/// The address of a plugin item: `plugin.item`.
///
/// Plugin ids may themselves contain dots, so the item is everything after
/// the last dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FullId {
    /// Owning plugin.
    pub plugin: String,
    /// Item within the plugin.
    pub item: String,
}

impl FullId {
    /// Build an id from its parts.
    pub fn new(plugin: impl Into<String>, item: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            item: item.into(),
        }
    }

    /// An item of the embedded pseudo-plugin.
    pub fn embed(item: impl Into<String>) -> Self {
        Self::new(EMBED_PLUGIN_ID, item)
    }

    /// Whether this id belongs to the embedded pseudo-plugin.
    pub fn is_embed(&self) -> bool {
        self.plugin == EMBED_PLUGIN_ID
    }

    /// Parse `plugin.item`.
    pub fn parse(s: &str) -> Option<Self> {
        let (plugin, item) = s.rsplit_once('.')?;
        if plugin.is_empty() || item.is_empty() {
            return None;
        }
        Some(Self::new(plugin, item))
    }
}

impl fmt::Display for FullId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.plugin, self.item)
    }
}

impl TryFrom<String> for FullId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid full id '{value}'"))
    }
}

impl From<FullId> for String {
    fn from(id: FullId) -> Self {
        id.to_string()
    }
}
