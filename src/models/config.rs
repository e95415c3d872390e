//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::NewsSource;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and page extraction settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// News polling cadence and behavior
    #[serde(default)]
    pub poller: PollerConfig,

    /// Time-of-day alert cadence and schedule
    #[serde(default)]
    pub ticker: TickerConfig,

    /// Dedup state persistence
    #[serde(default)]
    pub storage: StorageConfig,

    /// Error reporting
    #[serde(default)]
    pub reporter: ReporterConfig,

    /// Discord destinations and credentials
    #[serde(default)]
    pub discord: DiscordConfig,

    /// Outbound message templates
    #[serde(default)]
    pub messages: MessageTemplates,

    /// News source registry
    #[serde(default = "defaults::sources")]
    pub sources: Vec<NewsSource>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Look up a registered source by name.
    pub fn source(&self, name: &str) -> Option<&NewsSource> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Names of all registered sources, in registry order.
    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name.clone()).collect()
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.max_concurrent == 0 {
            return Err(AppError::validation("crawler.max_concurrent must be > 0"));
        }
        if self.crawler.link_patterns.is_empty() {
            return Err(AppError::validation("crawler.link_patterns is empty"));
        }
        if self.poller.interval_secs == 0 {
            return Err(AppError::validation("poller.interval_secs must be > 0"));
        }
        if self.poller.fetch_limit == 0 {
            return Err(AppError::validation("poller.fetch_limit must be > 0"));
        }
        if self.ticker.interval_secs == 0 {
            return Err(AppError::validation("ticker.interval_secs must be > 0"));
        }
        self.ticker.validate()?;
        if self.reporter.max_chars == 0 {
            return Err(AppError::validation("reporter.max_chars must be > 0"));
        }
        url::Url::parse(&self.discord.api_base)
            .map_err(|e| AppError::validation(format!("discord.api_base: {e}")))?;

        if self.sources.is_empty() {
            return Err(AppError::validation("No sources defined"));
        }
        let mut names = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(AppError::validation("source name is empty"));
            }
            if !names.insert(source.name.as_str()) {
                return Err(AppError::validation(format!(
                    "duplicate source name '{}'",
                    source.name
                )));
            }
            source.base_url().map_err(|e| {
                AppError::validation(format!("source '{}' has invalid url: {e}", source.name))
            })?;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            poller: PollerConfig::default(),
            ticker: TickerConfig::default(),
            storage: StorageConfig::default(),
            reporter: ReporterConfig::default(),
            discord: DiscordConfig::default(),
            messages: MessageTemplates::default(),
            sources: defaults::sources(),
        }
    }
}

/// HTTP client and page extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Maximum concurrent page fetches within one poll cycle
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// URL fragments an article link must contain
    #[serde(default = "defaults::link_patterns")]
    pub link_patterns: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_concurrent: defaults::max_concurrent(),
            link_patterns: defaults::link_patterns(),
        }
    }
}

/// News polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Poll cadence in seconds
    #[serde(default = "defaults::poll_interval")]
    pub interval_secs: u64,

    /// Seconds after the first scheduled poll before announcements start
    #[serde(default = "defaults::bootstrap_delay")]
    pub bootstrap_delay_secs: u64,

    /// Pause between two dispatched notifications
    #[serde(default = "defaults::dispatch_delay")]
    pub dispatch_delay_ms: u64,

    /// Maximum items taken from each page
    #[serde(default = "defaults::fetch_limit")]
    pub fetch_limit: usize,

    /// Optional cap on remembered ids per source (unbounded when absent)
    #[serde(default)]
    pub max_known_per_source: Option<usize>,
}

impl PollerConfig {
    /// Effective retention cap, never smaller than the fetch window.
    pub fn retention(&self) -> Option<usize> {
        self.max_known_per_source
            .map(|cap| cap.max(self.fetch_limit))
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::poll_interval(),
            bootstrap_delay_secs: defaults::bootstrap_delay(),
            dispatch_delay_ms: defaults::dispatch_delay(),
            fetch_limit: defaults::fetch_limit(),
            max_known_per_source: None,
        }
    }
}

/// Time-of-day alert settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerConfig {
    /// Tick cadence in seconds
    #[serde(default = "defaults::tick_interval")]
    pub interval_secs: u64,

    /// Offset of the civil time zone from UTC, in hours
    #[serde(default = "defaults::utc_offset_hours")]
    pub utc_offset_hours: i32,

    /// First hour (inclusive) with an hourly alert
    #[serde(default = "defaults::hourly_start")]
    pub hourly_start_hour: u32,

    /// Last hour (inclusive) with an hourly alert
    #[serde(default = "defaults::hourly_end")]
    pub hourly_end_hour: u32,

    /// Hours at which the field boss appears
    #[serde(default = "defaults::field_boss_hours")]
    pub field_boss_hours: Vec<u32>,
}

impl TickerConfig {
    /// The fixed civil time zone alerts are evaluated in.
    pub fn zone(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).ok_or_else(|| {
            AppError::validation(format!(
                "ticker.utc_offset_hours out of range: {}",
                self.utc_offset_hours
            ))
        })
    }

    fn validate(&self) -> Result<()> {
        self.zone()?;
        if self.hourly_start_hour > 23 || self.hourly_end_hour > 23 {
            return Err(AppError::validation("ticker hourly range must be within 0..=23"));
        }
        if self.hourly_start_hour > self.hourly_end_hour {
            return Err(AppError::validation(
                "ticker.hourly_start_hour is after ticker.hourly_end_hour",
            ));
        }
        if let Some(h) = self.field_boss_hours.iter().find(|h| **h > 23) {
            return Err(AppError::validation(format!(
                "ticker.field_boss_hours contains invalid hour {h}"
            )));
        }
        Ok(())
    }
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::tick_interval(),
            utc_offset_hours: defaults::utc_offset_hours(),
            hourly_start_hour: defaults::hourly_start(),
            hourly_end_hour: defaults::hourly_end(),
            field_boss_hours: defaults::field_boss_hours(),
        }
    }
}

/// Dedup state persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON document holding known item ids per source
    #[serde(default = "defaults::state_file")]
    pub state_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_file: defaults::state_file(),
        }
    }
}

/// Error reporting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReporterConfig {
    /// Maximum characters of error text forwarded to the log channel
    #[serde(default = "defaults::report_max_chars")]
    pub max_chars: usize,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            max_chars: defaults::report_max_chars(),
        }
    }
}

/// Discord destinations. Ids of `0` in the environment mean "unset".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// REST API root
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    /// Bot token; normally supplied through `DISCORD_TOKEN`
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Retries after a 429 response
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u8,

    #[serde(default)]
    pub guild_id: Option<u64>,
    /// Channel for time-of-day alerts
    #[serde(default)]
    pub alert_channel_id: Option<u64>,
    /// Channel for error reports and startup messages
    #[serde(default)]
    pub log_channel_id: Option<u64>,
    /// Channel for news notifications
    #[serde(default)]
    pub notice_channel_id: Option<u64>,
    #[serde(default)]
    pub hour_tick_role_id: Option<u64>,
    #[serde(default)]
    pub field_boss_role_id: Option<u64>,
    #[serde(default)]
    pub announce_role_id: Option<u64>,
}

impl DiscordConfig {
    /// Override values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Override values using an arbitrary lookup (environment, test map).
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("DISCORD_TOKEN").filter(|t| !t.trim().is_empty()) {
            self.token = Some(token.trim().to_string());
        }

        let ids: [(&str, &mut Option<u64>); 7] = [
            ("GUILD_ID", &mut self.guild_id),
            ("ALERT_CHANNEL_ID", &mut self.alert_channel_id),
            ("LOG_CHANNEL_ID", &mut self.log_channel_id),
            ("NOTICE_CHANNEL_ID", &mut self.notice_channel_id),
            ("HOUR_TICK_ROLE_ID", &mut self.hour_tick_role_id),
            ("FIELD_BOSS_ROLE_ID", &mut self.field_boss_role_id),
            ("ANNOUNCE_ROLE_ID", &mut self.announce_role_id),
        ];
        for (key, slot) in ids {
            let Some(raw) = lookup(key) else { continue };
            match raw.trim().parse::<u64>() {
                Ok(0) => *slot = None,
                Ok(id) => *slot = Some(id),
                Err(_) => log::warn!("Ignoring {key}: '{raw}' is not a numeric id"),
            }
        }
    }

    /// Bot token, required for anything that talks to Discord.
    pub fn require_token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| AppError::config("DISCORD_TOKEN is not set"))
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::api_base(),
            token: None,
            timeout_secs: defaults::timeout(),
            max_retries: defaults::max_retries(),
            guild_id: None,
            alert_channel_id: None,
            log_channel_id: None,
            notice_channel_id: None,
            hour_tick_role_id: None,
            field_boss_role_id: None,
            announce_role_id: None,
        }
    }
}

/// Outbound message templates.
///
/// Supported placeholders:
/// - news: `{mention}`, `{label}`, `{time}`, `{link}`, `{title}`
/// - hourly: `{mention}`, `{date}`, `{time}`
/// - field boss: `{mention}`, `{time}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplates {
    #[serde(default = "defaults::news_template")]
    pub news: String,
    #[serde(default = "defaults::hourly_template")]
    pub hourly: String,
    #[serde(default = "defaults::field_boss_template")]
    pub field_boss: String,
    /// Posted to the log channel when the scheduler starts
    #[serde(default = "defaults::online_message")]
    pub online: String,
    /// Title used by the `test-notice` command
    #[serde(default = "defaults::test_title")]
    pub test_title: String,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self {
            news: defaults::news_template(),
            hourly: defaults::hourly_template(),
            field_boss: defaults::field_boss_template(),
            online: defaults::online_message(),
            test_title: defaults::test_title(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use crate::models::NewsSource;

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (DiscordBot; NPC Guild Helper)".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn max_concurrent() -> usize {
        4
    }
    pub fn link_patterns() -> Vec<String> {
        vec![
            "/News/Notice".into(),
            "/News/Update".into(),
            "/News/Events".into(),
            "/News/Devnote".into(),
        ]
    }

    // Poller defaults
    pub fn poll_interval() -> u64 {
        300
    }
    pub fn bootstrap_delay() -> u64 {
        10
    }
    pub fn dispatch_delay() -> u64 {
        500
    }
    pub fn fetch_limit() -> usize {
        5
    }

    // Ticker defaults (KST)
    pub fn tick_interval() -> u64 {
        60
    }
    pub fn utc_offset_hours() -> i32 {
        9
    }
    pub fn hourly_start() -> u32 {
        9
    }
    pub fn hourly_end() -> u32 {
        23
    }
    pub fn field_boss_hours() -> Vec<u32> {
        vec![12, 18, 20, 22]
    }

    pub fn state_file() -> PathBuf {
        PathBuf::from("seen.json")
    }

    pub fn report_max_chars() -> usize {
        1800
    }

    // Discord defaults
    pub fn api_base() -> String {
        "https://discord.com/api/v10".into()
    }
    pub fn max_retries() -> u8 {
        2
    }

    // Message defaults
    pub fn news_template() -> String {
        "{mention} {label} **새 글**\n🗓 `{time}`\n🔗 {link}\n**{title}**".into()
    }
    pub fn hourly_template() -> String {
        "{mention} ⏰ `{date}` **{time} 정각 알림!**".into()
    }
    pub fn field_boss_template() -> String {
        "{mention} 🐲 **필드보스 시간!** `{time}`".into()
    }
    pub fn online_message() -> String {
        "🤖 봇이 온라인입니다. 스케줄러 시작!".into()
    }
    pub fn test_title() -> String {
        "테스트용 공지입니다.".into()
    }

    // Source registry
    pub fn sources() -> Vec<NewsSource> {
        vec![
            NewsSource::new(
                "공지사항",
                "https://mabinogimobile.nexon.com/News/Notice",
                "📣 공지",
            ),
            NewsSource::new(
                "업데이트",
                "https://mabinogimobile.nexon.com/News/Update",
                "🛠 업데이트",
            ),
            NewsSource::new(
                "이벤트",
                "https://mabinogimobile.nexon.com/News/Events?headlineId=2501",
                "🎉 이벤트",
            ),
            NewsSource::new(
                "에린노트",
                "https://mabinogimobile.nexon.com/News/Devnote",
                "📔 에린노트",
            ),
        ]
    }
}
