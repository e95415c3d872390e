//! Service layer for the bot.
//!
//! This module contains the business logic for:
//! - News page fetching (`FeedFetcher`)
//! - Discord REST access (`DiscordClient`)
//! - Message rendering and delivery (`Dispatcher`)
//! - Failure reporting (`ErrorReporter`)
//! - Alert role toggling (`toggle_alert_role`)

pub mod discord;
pub mod dispatch;
pub mod feed;
pub mod reporter;
pub mod roles;

pub use discord::{Channel, ChatClient, DiscordClient};
pub use dispatch::Dispatcher;
pub use feed::{Anchor, AnchorExtractor, FeedFetcher, HttpPageFetcher, MarkupExtractor, PageFetcher};
pub use reporter::ErrorReporter;
pub use roles::{AlertRole, RoleDirectory, ToggleOutcome, toggle_alert_role};
