use crate::domain::market::{NewsItem, PriceBar, Quote};
use anyhow::Result;
use async_trait::async_trait;

/// Source of quotes and historical OHLCV bars.
///
/// Implementations map "no data" (unknown symbol, empty response) to
/// `Ok(None)` / `Ok(vec![])` rather than an error.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>>;

    /// Daily bars covering the last `days` days, oldest first.
    async fn get_historical_bars(&self, symbol: &str, days: u32) -> Result<Vec<PriceBar>>;
}

#[async_trait]
pub trait NewsProvider: Send + Sync {
    /// Headlines published in the last `days` days.
    async fn get_news(&self, symbol: &str, days: u32) -> Result<Vec<NewsItem>>;
}
