//! Dedup state persistence.
//!
//! The poll cycle remembers which items it has already handled, keyed by
//! source name. The whole state is rewritten on every save:
//!
//! ```text
//! {
//!   "공지사항": ["<sha256>", "<sha256>"],
//!   "업데이트": []
//! }
//! ```

pub mod local;

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

// Re-export for convenience
pub use local::JsonDedupStore;

/// Source name to known item ids, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedupState {
    sources: BTreeMap<String, Vec<String>>,
}

impl DedupState {
    /// An empty state with one entry per registered source.
    pub fn empty_for<S: AsRef<str>>(names: &[S]) -> Self {
        let mut state = Self::default();
        state.ensure_sources(names);
        state
    }

    /// Add missing entries for registered sources. Unknown entries are kept.
    pub fn ensure_sources<S: AsRef<str>>(&mut self, names: &[S]) {
        for name in names {
            self.sources.entry(name.as_ref().to_string()).or_default();
        }
    }

    pub fn ids(&self, source: &str) -> &[String] {
        self.sources.get(source).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn known_ids(&self, source: &str) -> HashSet<String> {
        self.ids(source).iter().cloned().collect()
    }

    pub fn contains(&self, source: &str, id: &str) -> bool {
        self.ids(source).iter().any(|known| known == id)
    }

    /// Record one id. Returns `false` when it was already known.
    pub fn insert(&mut self, source: &str, id: &str) -> bool {
        let ids = self.sources.entry(source.to_string()).or_default();
        if ids.iter().any(|known| known == id) {
            return false;
        }
        ids.push(id.to_string());
        true
    }

    /// Mark ids as seen just now, in the given order. Known ids move to the
    /// most recent end so retention never drops what is still listed.
    /// Returns how many ids were not known before.
    pub fn touch<'a>(&mut self, source: &str, ids: impl IntoIterator<Item = &'a str>) -> usize {
        let known = self.sources.entry(source.to_string()).or_default();
        let mut added = 0;
        for id in ids {
            match known.iter().position(|k| k == id) {
                Some(pos) => {
                    let existing = known.remove(pos);
                    known.push(existing);
                }
                None => {
                    known.push(id.to_string());
                    added += 1;
                }
            }
        }
        added
    }

    /// Keep at most `cap` of the most recent ids per source.
    pub fn trim_to(&mut self, cap: usize) {
        for ids in self.sources.values_mut() {
            if ids.len() > cap {
                ids.drain(..ids.len() - cap);
            }
        }
    }

    /// `(source, known count)` pairs in name order.
    pub fn summary(&self) -> Vec<(&str, usize)> {
        self.sources
            .iter()
            .map(|(name, ids)| (name.as_str(), ids.len()))
            .collect()
    }
}

/// Persistence backend for [`DedupState`].
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Load the state. Never fails: a missing or unreadable document yields
    /// an empty state for every registered source.
    async fn load(&self) -> DedupState;

    /// Overwrite the persisted state.
    async fn save(&self, state: &DedupState) -> Result<()>;
}
