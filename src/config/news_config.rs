//! News and sentiment configuration parsing from environment variables.

use super::parse_env;
use anyhow::{Result, bail};

#[derive(Debug, Clone, PartialEq)]
pub struct NewsEnvConfig {
    pub lookback_days: u32,
    pub max_news_per_stock: usize,
    /// Largest magnitude of the sentiment weight passed to the forecaster
    pub sentiment_weight: f64,
}

impl NewsEnvConfig {
    pub fn from_env() -> Result<Self> {
        let sentiment_weight = parse_env("SENTIMENT_WEIGHT", 0.3)?;
        if !(0.0..=1.0).contains(&sentiment_weight) {
            bail!("SENTIMENT_WEIGHT must be within [0, 1], got {}", sentiment_weight);
        }

        Ok(Self {
            lookback_days: parse_env("NEWS_LOOKBACK_DAYS", 7)?,
            max_news_per_stock: parse_env("MAX_NEWS_PER_STOCK", 20)?,
            sentiment_weight,
        })
    }
}
