//! In-memory fakes shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::services::{Channel, ChatClient, PageFetcher};
use crate::storage::{DedupState, DedupStore};

/// Chat client that records every message it is asked to send.
#[derive(Default)]
pub(crate) struct RecordingChat {
    channels: HashSet<u64>,
    sent: Mutex<Vec<(u64, String)>>,
    fail_sends: AtomicBool,
    fail_next: AtomicUsize,
}

impl RecordingChat {
    pub(crate) fn with_channels(ids: &[u64]) -> Self {
        Self {
            channels: ids.iter().copied().collect(),
            ..Self::default()
        }
    }

    pub(crate) fn sent(&self) -> Vec<(u64, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Refuse only the next `count` sends.
    pub(crate) fn fail_next_sends(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatClient for RecordingChat {
    async fn resolve_channel(&self, id: u64) -> Result<Option<Channel>> {
        Ok(self
            .channels
            .contains(&id)
            .then(|| Channel { id, name: None }))
    }

    async fn send_message(&self, channel: &Channel, text: &str) -> Result<()> {
        let refuse_next = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refuse_next || self.fail_sends.load(Ordering::SeqCst) {
            return Err(AppError::discord(500, "send refused"));
        }
        self.sent.lock().unwrap().push((channel.id, text.to_string()));
        Ok(())
    }
}

/// Page fetcher serving canned markup per URL. Unknown URLs are 404s.
#[derive(Default)]
pub(crate) struct ScriptedPages {
    pages: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<String>>,
}

impl ScriptedPages {
    pub(crate) fn set(&self, url: &str, html: &str) {
        self.failing.lock().unwrap().remove(url);
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), html.to_string());
    }

    pub(crate) fn fail(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }
}

#[async_trait]
impl PageFetcher for ScriptedPages {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<String> {
        if self.failing.lock().unwrap().contains(url) {
            return Err(AppError::status(url, 503));
        }
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::status(url, 404))
    }
}

/// Dedup store kept in memory, with an optional save failure switch.
#[derive(Default)]
pub(crate) struct MemoryStore {
    state: Mutex<DedupState>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub(crate) fn snapshot(&self) -> DedupState {
        self.state.lock().unwrap().clone()
    }

    pub(crate) fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DedupStore for MemoryStore {
    async fn load(&self) -> DedupState {
        self.snapshot()
    }

    async fn save(&self, state: &DedupState) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(AppError::Io(std::io::Error::other("disk full")));
        }
        *self.state.lock().unwrap() = state.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
