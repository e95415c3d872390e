// src/models/mod.rs

//! Domain models for the bot.

mod alert;
mod config;
mod item;
mod source;

// Re-export all public types
pub use alert::TickAlert;
pub use config::{
    Config, CrawlerConfig, DiscordConfig, MessageTemplates, PollerConfig, ReporterConfig,
    StorageConfig, TickerConfig,
};
pub use item::{Item, item_id};
pub use source::NewsSource;
