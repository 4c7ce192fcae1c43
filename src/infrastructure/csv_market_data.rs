use crate::domain::market::{PriceBar, Quote};
use crate::domain::ports::MarketDataProvider;
use crate::infrastructure::mock::quote_from_bars;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Reads daily OHLCV history from `{dir}/{SYMBOL}.csv`.
///
/// Expected header: `timestamp,open,high,low,close,volume`. Timestamps may be
/// RFC 3339, `%Y-%m-%d %H:%M:%S` (UTC) or a bare `%Y-%m-%d` date.
pub struct CsvMarketDataProvider {
    dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvBar {
    #[serde(alias = "date", alias = "Date")]
    timestamp: String,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(alias = "Volume")]
    volume: f64,
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })
}

impl CsvMarketDataProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol))
    }

    /// All bars in the symbol's file, oldest first. A missing file is no data.
    async fn load(&self, symbol: &str) -> Result<Vec<PriceBar>> {
        let path = self.file_for(symbol);
        if !path.exists() {
            warn!("No price file for {} at {:?}", symbol, path);
            return Ok(Vec::new());
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read price file {:?}", path))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();
        for (line, row) in rdr.deserialize::<CsvBar>().enumerate() {
            let row = row.with_context(|| format!("Bad row {} in {:?}", line + 2, path))?;
            match parse_timestamp(&row.timestamp) {
                Some(ts) => bars.push(PriceBar::new(
                    ts, row.open, row.high, row.low, row.close, row.volume,
                )),
                None => warn!("Skipping row with unreadable timestamp '{}'", row.timestamp),
            }
        }

        bars.sort_by_key(|b| b.timestamp);
        debug!("Loaded {} bars for {} from {:?}", bars.len(), symbol, path);
        Ok(bars)
    }
}

#[async_trait]
impl MarketDataProvider for CsvMarketDataProvider {
    async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>> {
        Ok(quote_from_bars(symbol, &self.load(symbol).await?))
    }

    /// The file is a fixed snapshot, so the window ends at its last bar.
    async fn get_historical_bars(&self, symbol: &str, days: u32) -> Result<Vec<PriceBar>> {
        let bars = self.load(symbol).await?;
        let Some(last) = bars.last().map(|b| b.timestamp) else {
            return Ok(bars);
        };
        let cutoff = last - Duration::days(i64::from(days));
        Ok(bars.into_iter().filter(|b| b.timestamp > cutoff).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn create_test_dir() -> PathBuf {
        let unique_id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "stockcast_test_{}_{}_{}_prices",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0),
            unique_id
        ));
        fs::create_dir_all(&dir).expect("Failed to create test temp dir");
        dir
    }

    #[test]
    fn test_timestamp_formats() {
        assert!(parse_timestamp("2025-03-14T17:30:00+01:00").is_some());
        assert!(parse_timestamp("2025-03-14 17:30:00").is_some());
        assert_eq!(
            parse_timestamp("2025-03-14").map(|ts| ts.to_rfc3339()),
            Some("2025-03-14T00:00:00+00:00".to_string())
        );
        assert!(parse_timestamp("14/03/2025").is_none());
    }

    #[tokio::test]
    async fn test_reads_and_windows_bars() {
        let dir = create_test_dir();
        fs::write(
            dir.join("ENI.MI.csv"),
            "Date,Open,High,Low,Close,Volume\n\
             2025-03-12,14.0,14.3,13.9,14.1,1000\n\
             2025-03-10,13.8,14.0,13.7,13.9,1200\n\
             2025-03-13,14.1,14.5,14.0,14.4,900\n",
        )
        .unwrap();

        let provider = CsvMarketDataProvider::new(&dir);
        let bars = provider.get_historical_bars("ENI.MI", 2).await.unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 14.1);

        let quote = provider.get_quote("ENI.MI").await.unwrap().unwrap();
        assert_eq!(quote.current_price, 14.4);
        assert_eq!(quote.previous_close, 14.1);

        fs::remove_dir_all(dir).ok();
    }

    #[tokio::test]
    async fn test_missing_file_is_no_data() {
        let dir = create_test_dir();
        let provider = CsvMarketDataProvider::new(&dir);
        assert!(provider.get_historical_bars("NOPE.MI", 30).await.unwrap().is_empty());
        assert!(provider.get_quote("NOPE.MI").await.unwrap().is_none());
        fs::remove_dir_all(dir).ok();
    }
}
