// src/bot.rs

//! Wiring of the production services.

use std::sync::Arc;

use crate::error::Result;
use crate::models::Config;
use crate::pipeline::{AlertSchedule, BootstrapGate, PollCycle, Scheduler, TickCycle};
use crate::services::{
    AnchorExtractor, DiscordClient, Dispatcher, ErrorReporter, FeedFetcher, HttpPageFetcher,
};
use crate::storage::JsonDedupStore;
use crate::utils::http::create_async_client;

/// Fully wired bot, ready to schedule.
pub struct Bot {
    pub discord: Arc<DiscordClient>,
    pub dispatcher: Arc<Dispatcher>,
    pub reporter: Arc<ErrorReporter>,
    pub store: Arc<JsonDedupStore>,
    pub poll: Arc<PollCycle>,
    pub tick: Arc<TickCycle>,
    online_message: String,
    config: Config,
}

impl Bot {
    /// Build every service from `config` with a closed bootstrap gate.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_gate(config, BootstrapGate::new())
    }

    pub fn with_gate(config: Config, gate: BootstrapGate) -> Result<Self> {
        let discord = Arc::new(DiscordClient::new(&config.discord)?);
        let dispatcher = Arc::new(Dispatcher::new(discord.clone(), &config)?);
        let reporter = Arc::new(ErrorReporter::new(
            discord.clone(),
            config.discord.log_channel_id,
            config.reporter.max_chars,
        ));

        let feed = feed_fetcher(&config)?;
        let store = Arc::new(
            JsonDedupStore::new(&config.storage.state_file, config.source_names())
                .with_retention(config.poller.retention()),
        );
        let poll = Arc::new(PollCycle::new(
            feed,
            store.clone(),
            dispatcher.clone(),
            gate,
            &config,
        ));
        let tick = Arc::new(TickCycle::new(
            dispatcher.clone(),
            AlertSchedule::from_config(&config.ticker),
        ));

        Ok(Self {
            discord,
            dispatcher,
            reporter,
            store,
            poll,
            tick,
            online_message: config.messages.online.clone(),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(
            self.poll.clone(),
            self.tick.clone(),
            self.reporter.clone(),
            &self.config,
        )
    }

    /// Tell the log channel the bot is up.
    pub async fn announce_online(&self) -> bool {
        self.reporter.post(&self.online_message).await
    }
}

/// Feed fetcher over real HTTP, independent of Discord credentials.
pub fn feed_fetcher(config: &Config) -> Result<FeedFetcher> {
    let client = create_async_client(&config.crawler)?;
    Ok(FeedFetcher::new(
        Arc::new(HttpPageFetcher::new(client)),
        Arc::new(AnchorExtractor::new()?),
        config,
    ))
}
