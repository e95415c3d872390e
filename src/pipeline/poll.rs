// src/pipeline/poll.rs

//! News poll cycle.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Config, Item, NewsSource};
use crate::pipeline::BootstrapGate;
use crate::services::{Dispatcher, FeedFetcher};
use crate::storage::DedupStore;

/// What one cycle did for one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceOutcome {
    pub source: String,
    /// Candidate items returned by the fetcher
    pub fetched: usize,
    /// Candidates not previously known
    pub new: usize,
    /// Notifications actually sent
    pub announced: usize,
    /// `true` when new ids were only recorded because the gate was closed
    pub baselined: bool,
}

/// Summary of one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// The notice channel was unavailable and nothing was done
    pub skipped: bool,
    pub sources: Vec<SourceOutcome>,
}

impl PollReport {
    pub fn announced(&self) -> usize {
        self.sources.iter().map(|s| s.announced).sum()
    }

    pub fn new_items(&self) -> usize {
        self.sources.iter().map(|s| s.new).sum()
    }
}

/// Fetch, dedup and announce, once per invocation.
pub struct PollCycle {
    feed: FeedFetcher,
    store: Arc<dyn DedupStore>,
    dispatcher: Arc<Dispatcher>,
    sources: Vec<NewsSource>,
    gate: BootstrapGate,
    dispatch_delay: Duration,
}

impl PollCycle {
    pub fn new(
        feed: FeedFetcher,
        store: Arc<dyn DedupStore>,
        dispatcher: Arc<Dispatcher>,
        gate: BootstrapGate,
        config: &Config,
    ) -> Self {
        Self {
            feed,
            store,
            dispatcher,
            sources: config.sources.clone(),
            gate,
            dispatch_delay: Duration::from_millis(config.poller.dispatch_delay_ms),
        }
    }

    pub fn gate(&self) -> &BootstrapGate {
        &self.gate
    }

    pub fn sources(&self) -> &[NewsSource] {
        &self.sources
    }

    pub async fn run(&self) -> Result<PollReport> {
        self.run_at(Utc::now()).await
    }

    /// Run one cycle, stamping notifications with `now`.
    ///
    /// A dispatch or persistence failure aborts the cycle. Items already
    /// announced and saved stay saved; the failing item is retried next time.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<PollReport> {
        // Sampled once so a slow cycle cannot change mode halfway through
        let announcing = self.gate.elapsed();

        let Some(channel) = self.dispatcher.notice_channel().await? else {
            log::debug!("[news] notice channel unavailable, skipping cycle");
            return Ok(PollReport {
                skipped: true,
                ..PollReport::default()
            });
        };

        let fetched = self.feed.fetch_all(&self.sources).await;
        let mut report = PollReport::default();
        let mut dispatched = 0usize;

        for (source, items) in fetched {
            let mut outcome = SourceOutcome {
                source: source.name.clone(),
                fetched: items.len(),
                ..SourceOutcome::default()
            };
            if items.is_empty() {
                report.sources.push(outcome);
                continue;
            }

            let mut state = self.store.load().await;
            let known = state.known_ids(&source.name);
            let new: Vec<&Item> = items.iter().filter(|i| !known.contains(&i.id)).collect();
            outcome.new = new.len();

            if !announcing {
                let ids = items.iter().rev().map(|i| i.id.as_str());
                let recorded = state.touch(&source.name, ids);
                self.store.save(&state).await?;
                outcome.baselined = true;
                log::info!(
                    "[news] {}: bootstrap recorded {} item(s), nothing announced",
                    source.name,
                    recorded
                );
                report.sources.push(outcome);
                continue;
            }

            let still_listed = items
                .iter()
                .rev()
                .filter(|i| known.contains(&i.id))
                .map(|i| i.id.as_str());
            state.touch(&source.name, still_listed);

            for item in new.into_iter().rev() {
                if dispatched > 0 && !self.dispatch_delay.is_zero() {
                    tokio::time::sleep(self.dispatch_delay).await;
                }
                self.dispatcher.announce(&channel, source, item, now).await?;
                dispatched += 1;

                state.insert(&source.name, &item.id);
                self.store.save(&state).await?;
                outcome.announced += 1;
            }

            report.sources.push(outcome);
        }

        Ok(report)
    }
}
