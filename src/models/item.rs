//! News item data structure.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A news article candidate extracted from a listing page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    /// Dedup id, see [`item_id`]
    pub id: String,

    /// Visible anchor text
    pub title: String,

    /// Absolute URL of the article
    pub link: String,
}

impl Item {
    /// Build an item from an already-normalized absolute link.
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        let link = link.into();
        Self {
            id: item_id(&link),
            title: title.into(),
            link,
        }
    }

    /// Format item for display using a template.
    ///
    /// Supported placeholders: `{id}`, `{title}`, `{link}`
    pub fn format(&self, template: &str) -> String {
        template
            .replace("{id}", &self.id)
            .replace("{title}", &self.title)
            .replace("{link}", &self.link)
    }
}

/// Stable identity of an article: hex SHA-256 of its absolute link.
pub fn item_id(link: &str) -> String {
    hex::encode(Sha256::digest(link.as_bytes()))
}
