// src/config.rs

//! Configuration loading utilities.
//!
//! Order of precedence, lowest first: built-in defaults, the TOML file,
//! `.env`, then the process environment.

use std::path::Path;

use crate::error::Result;
use crate::models::Config;

/// Load the config file (or defaults), apply environment overrides and
/// validate the result.
pub fn load_all(path: &Path) -> Result<Config> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            log::warn!("Failed to read .env: {e}");
        }
    }

    let mut config = if path.exists() {
        Config::load_or_default(path)
    } else {
        log::info!("No config file at {}, using defaults", path.display());
        Config::default()
    };
    config.discord.apply_env();
    config.validate()?;

    log::debug!(
        "Loaded configuration with {} source(s): {}",
        config.sources.len(),
        config.source_names().join(", ")
    );
    Ok(config)
}
