//! Configuration module for stockcast.
//!
//! Structured configuration loaded from environment variables, organized by
//! concern: Forecaster, News, Ledger and Watch-list.

mod forecaster_config;
mod ledger_config;
mod news_config;
mod watchlist_config;

pub use forecaster_config::ForecasterEnvConfig;
pub use ledger_config::{LEDGER_FILE_NAME, LedgerEnvConfig};
pub use news_config::NewsEnvConfig;
pub use watchlist_config::{DEFAULT_STOCKS, Stock, WatchlistEnvConfig};

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

/// Read `key`, falling back to `default` when unset. A set but unparsable
/// value is an error.
pub(crate) fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .context(format!("Failed to parse {}", key)),
        Err(_) => Ok(default),
    }
}

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub forecaster: ForecasterEnvConfig,
    pub news: NewsEnvConfig,
    pub ledger: LedgerEnvConfig,
    pub watchlist: WatchlistEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            forecaster: ForecasterEnvConfig::from_env()
                .context("Failed to load forecaster config")?,
            news: NewsEnvConfig::from_env().context("Failed to load news config")?,
            ledger: LedgerEnvConfig::from_env(),
            watchlist: WatchlistEnvConfig::from_env().context("Failed to load watch-list config")?,
        })
    }
}
