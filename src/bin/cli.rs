//! newsbell CLI
//!
//! Runs the bot, plus a few operator commands for checking sources,
//! alert times and the dedup state without waiting for a cadence.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use newsbell::{
    bot::{self, Bot},
    config,
    error::{AppError, Result},
    models::{Item, TickAlert},
    pipeline::{AlertSchedule, BootstrapGate, due_alerts},
    services::{AlertRole, DiscordClient, toggle_alert_role},
    storage::JsonDedupStore,
};

/// newsbell - Mabinogi Mobile news and alert bot
#[derive(Parser, Debug)]
#[command(
    name = "newsbell",
    version,
    about = "Posts new Mabinogi Mobile news and time-of-day alerts to Discord"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scheduler until Ctrl-C
    Run,

    /// Run a single poll cycle
    PollOnce {
        /// Announce new items instead of only recording them
        #[arg(long)]
        announce: bool,
    },

    /// Fetch one source and print its items without touching state
    Fetch {
        /// Source name, e.g. 공지사항
        source: String,
    },

    /// Post a sample notification to the notice channel
    TestNotice,

    /// Show which alerts fire at a given time
    Ticks {
        /// RFC 3339 timestamp (default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Toggle an alert role for a guild member
    ToggleRole {
        /// Discord user id
        #[arg(long)]
        user: u64,

        #[arg(long, value_enum)]
        kind: AlertKind,
    },

    /// Validate configuration
    Validate,

    /// Show dedup state info
    Info,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum AlertKind {
    Hourly,
    FieldBoss,
}

impl From<AlertKind> for TickAlert {
    fn from(kind: AlertKind) -> Self {
        match kind {
            AlertKind::Hourly => TickAlert::Hourly,
            AlertKind::FieldBoss => TickAlert::FieldBoss,
        }
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = config::load_all(&cli.config)?;
    log::debug!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Run => {
            let bot = Bot::new(config)?;
            bot.announce_online().await;

            let handle = bot.scheduler().start();
            tokio::signal::ctrl_c().await?;
            log::info!("Ctrl-C received, shutting down");
            handle.shutdown().await;
        }

        Command::PollOnce { announce } => {
            let gate = if announce {
                BootstrapGate::opened()
            } else {
                BootstrapGate::new()
            };
            let bot = Bot::with_gate(config, gate)?;
            let report = bot.poll.run().await?;

            if report.skipped {
                log::warn!("Notice channel unavailable, nothing done");
            }
            for outcome in &report.sources {
                log::info!(
                    "{}: fetched {}, new {}, announced {}{}",
                    outcome.source,
                    outcome.fetched,
                    outcome.new,
                    outcome.announced,
                    if outcome.baselined { " (recorded only)" } else { "" }
                );
            }
        }

        Command::Fetch { source } => {
            let Some(news_source) = config.source(&source) else {
                return Err(AppError::config(format!(
                    "Unknown source '{source}'. Known: {}",
                    config.source_names().join(", ")
                )));
            };
            let items = bot::feed_fetcher(&config)?.try_fetch(news_source).await?;

            log::info!("{} item(s) from {}", items.len(), news_source.url);
            for item in &items {
                println!("{}", item.format("{title}\n  {link}\n  {id}"));
            }
        }

        Command::TestNotice => {
            let bot = Bot::new(config)?;
            let Some(source) = bot.config().sources.first() else {
                return Err(AppError::config("No sources defined"));
            };
            let Some(channel) = bot.dispatcher.notice_channel().await? else {
                return Err(AppError::config("Notice channel is not configured or not reachable"));
            };

            let item = Item::new(bot.config().messages.test_title.clone(), source.url.clone());
            bot.dispatcher.announce(&channel, source, &item, Utc::now()).await?;
            log::info!("Test notice sent to channel {}", channel.id);
        }

        Command::Ticks { at } => {
            let now = match at {
                Some(raw) => DateTime::parse_from_rfc3339(&raw)
                    .map_err(|e| AppError::validation(format!("--at '{raw}': {e}")))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };
            let local = now.with_timezone(&config.ticker.zone()?);
            let due = due_alerts(&AlertSchedule::from_config(&config.ticker), &local);

            if due.is_empty() {
                log::info!("{}: no alerts due", local.format("%Y-%m-%d %H:%M %:z"));
            }
            for alert in due {
                log::info!("{}: {} alert due", local.format("%Y-%m-%d %H:%M %:z"), alert);
            }
        }

        Command::ToggleRole { user, kind } => {
            let Some(guild_id) = config.discord.guild_id else {
                return Err(AppError::config("GUILD_ID is not set"));
            };
            let discord = DiscordClient::new(&config.discord)?;
            let role = AlertRole::for_alert(kind.into(), &config.discord);

            let (outcome, ack) = toggle_alert_role(&discord, guild_id, user, &role).await?;
            log::debug!("Toggle outcome: {outcome:?}");
            println!("{ack}");
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            config.validate()?;
            log::info!("✓ Config OK ({} sources)", config.sources.len());

            if config.discord.require_token().is_err() {
                log::warn!("DISCORD_TOKEN is not set; 'run' will fail");
            }
            for (key, value) in [
                ("NOTICE_CHANNEL_ID", config.discord.notice_channel_id),
                ("ALERT_CHANNEL_ID", config.discord.alert_channel_id),
                ("LOG_CHANNEL_ID", config.discord.log_channel_id),
            ] {
                if value.is_none() {
                    log::warn!("{key} is not set");
                }
            }

            log::info!("All validations passed!");
        }

        Command::Info => {
            let store = JsonDedupStore::new(&config.storage.state_file, config.source_names());
            log::info!("State file: {}", store.path().display());

            match store.read().await? {
                Some(state) => {
                    for (source, count) in state.summary() {
                        log::info!("  {source}: {count} known id(s)");
                    }
                }
                None => log::info!("State file not found (first run will bootstrap)"),
            }
        }
    }

    Ok(())
}
