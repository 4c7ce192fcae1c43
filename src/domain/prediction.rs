use crate::domain::horizon::Horizon;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Serde format for ledger timestamps: `%Y-%m-%d %H:%M:%S`, UTC.
pub mod ledger_timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&ts.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(raw.trim(), FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}

/// Accepts `true`/`false` in any case as well as `1`/`0`.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "invalid accuracy_evaluated flag: {}",
            other
        ))),
    }
}

/// One row of the prediction ledger. Column order is the on-disk order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    #[serde(with = "ledger_timestamp")]
    pub prediction_timestamp: DateTime<Utc>,
    pub symbol: String,
    pub stock_name: String,
    pub current_price: f64,
    pub horizon: Horizon,
    #[serde(with = "ledger_timestamp")]
    pub target_timestamp: DateTime<Utc>,
    pub predicted_price: f64,
    pub predicted_change_pct: f64,
    // Filled by reconciliation
    pub actual_price: Option<f64>,
    pub actual_change_pct: Option<f64>,
    pub error_pct: Option<f64>,
    #[serde(deserialize_with = "deserialize_flag")]
    pub accuracy_evaluated: bool,
}

impl PredictionRecord {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.accuracy_evaluated && self.target_timestamp <= now
    }

    /// True when predicted and realized changes share a sign (zero is its own sign).
    pub fn direction_correct(&self) -> Option<bool> {
        self.actual_change_pct
            .map(|actual| direction(self.predicted_change_pct) == direction(actual))
    }
}

fn direction(change: f64) -> i8 {
    if change > 0.0 {
        1
    } else if change < 0.0 {
        -1
    } else {
        0
    }
}

/// Column names of the ledger file, in order.
pub const LEDGER_COLUMNS: &[&str] = &[
    "prediction_timestamp",
    "symbol",
    "stock_name",
    "current_price",
    "horizon",
    "target_timestamp",
    "predicted_price",
    "predicted_change_pct",
    "actual_price",
    "actual_change_pct",
    "error_pct",
    "accuracy_evaluated",
];

/// Aggregate accuracy over a (possibly filtered) set of ledger rows.
///
/// Numeric fields are `None` when nothing has been evaluated yet; zero would
/// read as a perfect score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyStats {
    pub total_predictions: usize,
    pub evaluated_predictions: usize,
    pub average_error_pct: Option<f64>,
    pub median_error_pct: Option<f64>,
    pub best_prediction_error: Option<f64>,
    pub worst_prediction_error: Option<f64>,
    pub correct_direction_pct: Option<f64>,
}

impl AccuracyStats {
    pub fn unevaluated(total_predictions: usize) -> Self {
        Self {
            total_predictions,
            evaluated_predictions: 0,
            average_error_pct: None,
            median_error_pct: None,
            best_prediction_error: None,
            worst_prediction_error: None,
            correct_direction_pct: None,
        }
    }
}

/// Accuracy of the evaluated predictions for one horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonAccuracy {
    pub horizon: Horizon,
    pub count: usize,
    pub average_error_pct: f64,
    pub median_error_pct: f64,
    pub best_prediction_error: f64,
    pub worst_prediction_error: f64,
    pub correct_direction_pct: f64,
}

/// Horizon and sentiment inputs of a forecast call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionRequest {
    pub hours: u32,
    pub days: u32,
    pub sentiment_weight: f64,
}

impl Default for PredictionRequest {
    fn default() -> Self {
        Self {
            hours: 0,
            days: 1,
            sentiment_weight: 0.0,
        }
    }
}

impl PredictionRequest {
    pub fn for_horizon(horizon: Horizon, sentiment_weight: f64) -> Self {
        match horizon {
            Horizon::Hours(hours) => Self {
                hours,
                days: 0,
                sentiment_weight,
            },
            Horizon::Days(days) => Self {
                hours: 0,
                days,
                sentiment_weight,
            },
        }
    }

    /// Hours take precedence over days when both are set.
    pub fn horizon(&self) -> Horizon {
        if self.hours > 0 {
            Horizon::Hours(self.hours)
        } else {
            Horizon::Days(self.days.max(1))
        }
    }
}

/// Which sub-models contributed to a forecast and with what weight.
///
/// Informational only: nothing downstream recomputes from it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelWeights {
    pub seasonal: Option<f64>,
    pub regression: Option<f64>,
    pub sentiment: f64,
}

/// Output of a successful ensemble forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub horizon: Horizon,
    /// One predicted price per daily step
    pub predictions: Vec<f64>,
    /// Only present when the seasonal branch ran
    pub confidence_lower: Option<Vec<f64>>,
    pub confidence_upper: Option<Vec<f64>>,
    pub model_weights: ModelWeights,
}

impl PredictionResult {
    /// Price at the end of the horizon: the one logged to the ledger.
    pub fn final_price(&self) -> Option<f64> {
        self.predictions.last().copied()
    }
}

/// Expected move of a forecast relative to the current price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceTrend {
    Up,
    Down,
    Stable,
}

impl PriceTrend {
    /// Default dead zone, in percent.
    pub const DEFAULT_THRESHOLD_PCT: f64 = 0.5;

    pub fn classify(current_price: f64, predicted_price: f64, threshold_pct: f64) -> Self {
        let change_pct = percent_change(current_price, predicted_price);
        if change_pct.abs() < threshold_pct {
            Self::Stable
        } else if change_pct > 0.0 {
            Self::Up
        } else {
            Self::Down
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            Self::Up => "↑",
            Self::Down => "↓",
            Self::Stable => "→",
        }
    }
}

impl fmt::Display for PriceTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "Up"),
            Self::Down => write!(f, "Down"),
            Self::Stable => write!(f, "Stable"),
        }
    }
}

/// `(to - from) / from * 100`
pub fn percent_change(from: f64, to: f64) -> f64 {
    (to - from) / from * 100.0
}
