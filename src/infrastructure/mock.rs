use crate::domain::market::{PriceBar, Quote};
use crate::domain::ports::MarketDataProvider;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use tracing::debug;

// Quotes come from the same window the service trains on by default
const QUOTE_HISTORY_DAYS: u32 = 730;

/// Deterministic synthetic daily bars: slow cycle, weekly ripple, drift and
/// seeded noise. The same symbol and end date always give the same series.
#[derive(Debug, Clone)]
pub struct MockMarketDataProvider {
    seed: u64,
    end: Option<DateTime<Utc>>,
}

impl MockMarketDataProvider {
    pub fn new(seed: u64) -> Self {
        Self { seed, end: None }
    }

    /// Pin the last bar to `end` instead of the current time.
    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    fn symbol_seed(&self, symbol: &str) -> u64 {
        symbol
            .bytes()
            .fold(self.seed, |acc, b| acc.wrapping_mul(31).wrapping_add(u64::from(b)))
    }

    fn base_price(symbol: &str) -> f64 {
        match symbol {
            "ENI.MI" => 14.0,
            "ISP.MI" => 3.5,
            "UCG.MI" => 35.0,
            "ENEL.MI" => 6.8,
            "A2A.MI" => 1.9,
            "TIT.MI" => 0.25,
            "G.MI" => 24.0,
            "RACE.MI" => 420.0,
            "BAMI.MI" => 6.0,
            "TEN.MI" => 15.0,
            _ => 100.0,
        }
    }

    /// Weekday bars at the 17:30 UTC close within the last `days` days.
    pub fn bars(&self, symbol: &str, days: u32) -> Vec<PriceBar> {
        let end = self.end.unwrap_or_else(Utc::now);
        let close_time = NaiveTime::from_hms_opt(17, 30, 0).unwrap_or(NaiveTime::MIN);
        let end_day = end.date_naive();
        let base = Self::base_price(symbol);
        let mut rng = StdRng::seed_from_u64(self.symbol_seed(symbol));

        let mut bars = Vec::new();
        let mut previous = base;
        for offset in (0..i64::from(days)).rev() {
            let day = end_day - Duration::days(offset);
            if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                continue;
            }

            let t = bars.len() as f64;
            let close = base
                * (1.0
                    + 0.08 * (2.0 * PI * t / 63.0).sin()
                    + 0.01 * (2.0 * PI * t / 5.0).sin()
                    + 0.0002 * t
                    + rng.random_range(-0.01..=0.01));
            let open = previous;
            let spread = base * rng.random_range(0.002..=0.01);
            let volume = rng.random_range(500_000.0..=2_000_000.0_f64).round();

            bars.push(PriceBar::new(
                day.and_time(close_time).and_utc(),
                open,
                open.max(close) + spread,
                open.min(close) - spread,
                close,
                volume,
            ));
            previous = close;
        }

        debug!("Generated {} mock bars for {}", bars.len(), symbol);
        bars
    }
}

impl Default for MockMarketDataProvider {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Quote derived from the last two bars of a series.
pub(crate) fn quote_from_bars(symbol: &str, bars: &[PriceBar]) -> Option<Quote> {
    let last = bars.last()?;
    let previous_close = bars
        .len()
        .checked_sub(2)
        .map(|i| bars[i].close)
        .unwrap_or(last.open);
    let change_pct = if previous_close != 0.0 {
        (last.close - previous_close) / previous_close * 100.0
    } else {
        0.0
    };

    Some(Quote {
        symbol: symbol.to_string(),
        current_price: last.close,
        open: last.open,
        high: last.high,
        low: last.low,
        previous_close,
        change_pct,
        timestamp: last.timestamp,
    })
}

#[async_trait]
impl MarketDataProvider for MockMarketDataProvider {
    async fn get_quote(&self, symbol: &str) -> Result<Option<Quote>> {
        Ok(quote_from_bars(symbol, &self.bars(symbol, QUOTE_HISTORY_DAYS)))
    }

    async fn get_historical_bars(&self, symbol: &str, days: u32) -> Result<Vec<PriceBar>> {
        Ok(self.bars(symbol, days))
    }
}
