// src/lib.rs

//! newsbell: news board watcher and time-of-day alert bot for Discord.

pub mod bot;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;
