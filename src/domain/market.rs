use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Derived indicator columns attached to a bar.
///
/// `None` means the indicator is undefined for this bar (not enough history
/// yet, or the enrichment step was skipped for a short series).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub rsi_14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_diff: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_middle: Option<f64>,
    pub bb_lower: Option<f64>,
    pub atr_14: Option<f64>,
}

/// One OHLCV row for a single timestamp, plus indicator columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub indicators: Indicators,
}

impl PriceBar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            indicators: Indicators::default(),
        }
    }
}

/// Current quote snapshot for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub current_price: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub previous_close: f64,
    pub change_pct: f64,
    pub timestamp: DateTime<Utc>,
}

/// A headline with its summary, as returned by a news provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub headline: String,
    pub summary: String,
    pub source: String,
    pub url: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// Last close of an ordered series, if any.
pub fn last_close(bars: &[PriceBar]) -> Option<f64> {
    bars.last().map(|b| b.close)
}

/// Checks that timestamps are strictly increasing.
pub fn is_chronological(bars: &[PriceBar]) -> bool {
    bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp)
}
