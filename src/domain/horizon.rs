use crate::domain::errors::MalformedHorizon;
use chrono::Duration;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A labeled forecast distance: `{n}h` or `{n}d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Horizon {
    Hours(u32),
    Days(u32),
}

impl Horizon {
    /// Wall-clock distance between a prediction and its target.
    pub fn duration(&self) -> Duration {
        match self {
            Horizon::Hours(h) => Duration::hours(i64::from(*h)),
            Horizon::Days(d) => Duration::days(i64::from(*d)),
        }
    }

    /// Number of daily forecast steps needed to cover this horizon.
    ///
    /// One day is the minimum granularity: sub-day horizons round down to
    /// whole days with a floor of one step.
    pub fn forecast_steps(&self) -> usize {
        match self {
            Horizon::Hours(h) => ((*h / 24) as usize).max(1),
            Horizon::Days(d) => (*d as usize).max(1),
        }
    }

    /// Longest forecast the models will roll forward, in daily steps.
    pub const MAX_FORECAST_STEPS: usize = 3_660;

    /// The default horizons tracked for every symbol.
    pub fn defaults() -> Vec<Horizon> {
        vec![
            Horizon::Hours(2),
            Horizon::Days(1),
            Horizon::Days(3),
            Horizon::Days(7),
        ]
    }
}

// Shortest first; `24h` sorts before `1d`
impl Ord for Horizon {
    fn cmp(&self, other: &Self) -> Ordering {
        self.duration()
            .cmp(&other.duration())
            .then_with(|| matches!(self, Horizon::Days(_)).cmp(&matches!(other, Horizon::Days(_))))
    }
}

impl PartialOrd for Horizon {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Horizon::Hours(h) => write!(f, "{}h", h),
            Horizon::Days(d) => write!(f, "{}d", d),
        }
    }
}

impl FromStr for Horizon {
    type Err = MalformedHorizon;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || MalformedHorizon(s.to_string());

        if !s.is_ascii() || s.len() < 2 {
            return Err(malformed());
        }

        let (digits, unit) = s.split_at(s.len() - 1);
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let value: u32 = digits.parse().map_err(|_| malformed())?;

        match unit {
            "h" => Ok(Horizon::Hours(value)),
            "d" => Ok(Horizon::Days(value)),
            _ => Err(malformed()),
        }
    }
}

impl Serialize for Horizon {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Horizon {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
