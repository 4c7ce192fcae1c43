//! Technical indicators over daily bars, and the signals read off them.
//!
//! Indicators stay `None` until their window has filled, so the feature
//! builder can tell "undefined" from a real zero.

use crate::domain::market::{Indicators, PriceBar};
use serde::{Deserialize, Serialize};
use std::fmt;
use ta::Next;
use ta::indicators::{
    AverageTrueRange, BollingerBands, ExponentialMovingAverage, MovingAverageConvergenceDivergence,
    RelativeStrengthIndex, SimpleMovingAverage,
};
use tracing::{debug, warn};

/// Below this many bars `enrich` leaves the input untouched.
pub const MIN_BARS_FOR_INDICATORS: usize = 200;

const RSI_PERIOD: usize = 14;
const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;
const BB_PERIOD: usize = 20;
const BB_STD_DEV: f64 = 2.0;
const ATR_PERIOD: usize = 14;

struct IndicatorSet {
    sma_20: SimpleMovingAverage,
    sma_50: SimpleMovingAverage,
    sma_200: SimpleMovingAverage,
    ema_12: ExponentialMovingAverage,
    ema_26: ExponentialMovingAverage,
    rsi: RelativeStrengthIndex,
    macd: MovingAverageConvergenceDivergence,
    bb: BollingerBands,
    atr: AverageTrueRange,
}

impl IndicatorSet {
    fn new() -> Result<Self, ta::errors::TaError> {
        Ok(Self {
            sma_20: SimpleMovingAverage::new(20)?,
            sma_50: SimpleMovingAverage::new(50)?,
            sma_200: SimpleMovingAverage::new(200)?,
            ema_12: ExponentialMovingAverage::new(12)?,
            ema_26: ExponentialMovingAverage::new(26)?,
            rsi: RelativeStrengthIndex::new(RSI_PERIOD)?,
            macd: MovingAverageConvergenceDivergence::new(MACD_FAST, MACD_SLOW, MACD_SIGNAL)?,
            bb: BollingerBands::new(BB_PERIOD, BB_STD_DEV)?,
            atr: AverageTrueRange::new(ATR_PERIOD)?,
        })
    }

    /// Feed one bar; `seen` is the number of bars fed so far, this one included.
    fn next(&mut self, bar: &PriceBar, seen: usize) -> Indicators {
        let close = bar.close;
        let ready = |period: usize| seen >= period;
        let keep = |period: usize, value: f64| ready(period).then_some(value);

        let sma_20 = self.sma_20.next(close);
        let sma_50 = self.sma_50.next(close);
        let sma_200 = self.sma_200.next(close);
        let ema_12 = self.ema_12.next(close);
        let ema_26 = self.ema_26.next(close);
        let rsi = self.rsi.next(close);
        let macd = self.macd.next(close);
        let bb = self.bb.next(close);

        let atr = match ta::DataItem::builder()
            .open(bar.open)
            .high(bar.high)
            .low(bar.low)
            .close(close)
            .volume(bar.volume)
            .build()
        {
            Ok(item) => Some(self.atr.next(&item)),
            Err(e) => {
                warn!("Skipping ATR for bar at {}: {:?}", bar.timestamp, e);
                None
            }
        };

        Indicators {
            // RSI needs one extra bar: it works on price differences
            rsi_14: keep(RSI_PERIOD + 1, rsi),
            macd: keep(MACD_SLOW, macd.macd),
            macd_signal: keep(MACD_SLOW + MACD_SIGNAL - 1, macd.signal),
            macd_diff: keep(MACD_SLOW + MACD_SIGNAL - 1, macd.histogram),
            sma_20: keep(20, sma_20),
            sma_50: keep(50, sma_50),
            sma_200: keep(200, sma_200),
            ema_12: Some(ema_12),
            ema_26: Some(ema_26),
            bb_upper: keep(BB_PERIOD, bb.upper),
            bb_middle: keep(BB_PERIOD, bb.average),
            bb_lower: keep(BB_PERIOD, bb.lower),
            atr_14: atr.filter(|_| ready(ATR_PERIOD)),
        }
    }
}

/// Attach indicators to every bar. Histories shorter than
/// [`MIN_BARS_FOR_INDICATORS`] come back unchanged.
pub fn enrich(bars: &[PriceBar]) -> Vec<PriceBar> {
    if bars.len() < MIN_BARS_FOR_INDICATORS {
        debug!(
            "Indicators skipped: {} bars, need {}",
            bars.len(),
            MIN_BARS_FOR_INDICATORS
        );
        return bars.to_vec();
    }

    let mut set = match IndicatorSet::new() {
        Ok(set) => set,
        Err(e) => {
            warn!("Indicator setup failed: {:?}", e);
            return bars.to_vec();
        }
    };

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let mut enriched = bar.clone();
            enriched.indicators = set.next(bar, i + 1);
            enriched
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RsiSignal {
    Oversold,
    Overbought,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MacdSignal {
    BullishCrossover,
    BearishCrossover,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BandSignal {
    AboveUpper,
    BelowLower,
    Within,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovingAverageSignal {
    Bullish,
    Bearish,
    Mixed,
}

impl fmt::Display for RsiSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oversold => write!(f, "OVERSOLD - Possible Buy"),
            Self::Overbought => write!(f, "OVERBOUGHT - Possible Sell"),
            Self::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

impl fmt::Display for MacdSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BullishCrossover => write!(f, "BULLISH CROSSOVER - Buy Signal"),
            Self::BearishCrossover => write!(f, "BEARISH CROSSOVER - Sell Signal"),
            Self::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

impl fmt::Display for BandSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AboveUpper => write!(f, "ABOVE UPPER BAND - Overbought"),
            Self::BelowLower => write!(f, "BELOW LOWER BAND - Oversold"),
            Self::Within => write!(f, "WITHIN BANDS - Normal"),
        }
    }
}

impl fmt::Display for MovingAverageSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bullish => write!(f, "BULLISH - Price above MAs"),
            Self::Bearish => write!(f, "BEARISH - Price below MAs"),
            Self::Mixed => write!(f, "MIXED"),
        }
    }
}

/// Signals read from the last two enriched bars. A field is `None` when the
/// indicators it needs are undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TradingSignals {
    pub rsi: Option<RsiSignal>,
    pub macd: Option<MacdSignal>,
    pub bollinger: Option<BandSignal>,
    pub moving_average: Option<MovingAverageSignal>,
}

pub fn trading_signals(bars: &[PriceBar]) -> TradingSignals {
    let [.., prev, latest] = bars else {
        return TradingSignals::default();
    };
    let (now, before) = (&latest.indicators, &prev.indicators);

    let rsi = now.rsi_14.map(|rsi| {
        if rsi < 30.0 {
            RsiSignal::Oversold
        } else if rsi > 70.0 {
            RsiSignal::Overbought
        } else {
            RsiSignal::Neutral
        }
    });

    let macd = match (now.macd, now.macd_signal, before.macd, before.macd_signal) {
        (Some(m), Some(s), Some(pm), Some(ps)) => Some(if pm < ps && m > s {
            MacdSignal::BullishCrossover
        } else if pm > ps && m < s {
            MacdSignal::BearishCrossover
        } else {
            MacdSignal::Neutral
        }),
        _ => None,
    };

    let bollinger = match (now.bb_upper, now.bb_lower) {
        (Some(upper), Some(lower)) => Some(if latest.close > upper {
            BandSignal::AboveUpper
        } else if latest.close < lower {
            BandSignal::BelowLower
        } else {
            BandSignal::Within
        }),
        _ => None,
    };

    let moving_average = match (now.sma_20, now.sma_50) {
        (Some(fast), Some(slow)) => Some(if fast > slow && latest.close > fast {
            MovingAverageSignal::Bullish
        } else if fast < slow && latest.close < fast {
            MovingAverageSignal::Bearish
        } else {
            MovingAverageSignal::Mixed
        }),
        _ => None,
    };

    TradingSignals {
        rsi,
        macd,
        bollinger,
        moving_average,
    }
}
