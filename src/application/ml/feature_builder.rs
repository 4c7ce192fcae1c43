use crate::domain::errors::ForecastError;
use crate::domain::market::PriceBar;
use serde::{Deserialize, Serialize};

/// Ordered list of candidate feature columns.
/// Close is always first: targets and inverse transforms read slot 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureColumn {
    Close,
    Rsi14,
    Macd,
    Sma20,
    Sma50,
    Volume,
}

impl FeatureColumn {
    pub const ALL: [FeatureColumn; 6] = [
        FeatureColumn::Close,
        FeatureColumn::Rsi14,
        FeatureColumn::Macd,
        FeatureColumn::Sma20,
        FeatureColumn::Sma50,
        FeatureColumn::Volume,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FeatureColumn::Close => "close",
            FeatureColumn::Rsi14 => "RSI_14",
            FeatureColumn::Macd => "MACD",
            FeatureColumn::Sma20 => "SMA_20",
            FeatureColumn::Sma50 => "SMA_50",
            FeatureColumn::Volume => "volume",
        }
    }

    /// Raw value for a bar; `None` when the indicator is undefined.
    pub fn value(&self, bar: &PriceBar) -> Option<f64> {
        match self {
            FeatureColumn::Close => Some(bar.close),
            FeatureColumn::Rsi14 => bar.indicators.rsi_14,
            FeatureColumn::Macd => bar.indicators.macd,
            FeatureColumn::Sma20 => bar.indicators.sma_20,
            FeatureColumn::Sma50 => bar.indicators.sma_50,
            FeatureColumn::Volume => Some(bar.volume),
        }
    }
}

/// Columns present in the input: close, plus every indicator defined on at
/// least one bar. Indicators never computed for a short history are omitted.
pub fn present_columns(bars: &[PriceBar]) -> Vec<FeatureColumn> {
    FeatureColumn::ALL
        .iter()
        .copied()
        .filter(|col| *col == FeatureColumn::Close || bars.iter().any(|b| col.value(b).is_some()))
        .collect()
}

/// Raw feature rows for the given columns. Undefined or non-finite values become 0.
pub fn feature_matrix(bars: &[PriceBar], columns: &[FeatureColumn]) -> Vec<Vec<f64>> {
    bars.iter()
        .map(|bar| {
            columns
                .iter()
                .map(|col| match col.value(bar) {
                    Some(v) if v.is_finite() => v,
                    _ => 0.0,
                })
                .collect()
        })
        .collect()
}

/// Per-column min-max scaling into [0, 1].
///
/// Columns with zero range keep unit scale, so they map to 0 and invert back
/// to their constant value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    data_min: Vec<f64>,
    scale: Vec<f64>,
}

impl MinMaxScaler {
    /// Fit over all rows at once. `None` for an empty or ragged matrix.
    pub fn fit(rows: &[Vec<f64>]) -> Option<Self> {
        let width = rows.first()?.len();
        if width == 0 || rows.iter().any(|r| r.len() != width) {
            return None;
        }

        let mut data_min = vec![f64::INFINITY; width];
        let mut data_max = vec![f64::NEG_INFINITY; width];
        for row in rows {
            for (j, v) in row.iter().enumerate() {
                data_min[j] = data_min[j].min(*v);
                data_max[j] = data_max[j].max(*v);
            }
        }

        let scale = data_min
            .iter()
            .zip(&data_max)
            .map(|(lo, hi)| {
                let range = hi - lo;
                if range > 0.0 { 1.0 / range } else { 1.0 }
            })
            .collect();

        Some(Self { data_min, scale })
    }

    pub fn n_features(&self) -> usize {
        self.data_min.len()
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, ForecastError> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(self.data_min.iter().zip(&self.scale))
            .map(|(v, (lo, s))| (v - lo) * s)
            .collect())
    }

    pub fn inverse_transform_row(&self, row: &[f64]) -> Result<Vec<f64>, ForecastError> {
        self.check_width(row.len())?;
        Ok(row
            .iter()
            .zip(self.data_min.iter().zip(&self.scale))
            .map(|(v, (lo, s))| v / s + lo)
            .collect())
    }

    /// Price-scale close for a scaled close, via a full-width row that is
    /// zero outside the close slot. Only the close slot of the result is used.
    pub fn inverse_close(&self, scaled_close: f64, width: usize) -> Result<f64, ForecastError> {
        let mut row = vec![0.0; width];
        if let Some(first) = row.first_mut() {
            *first = scaled_close;
        }
        let restored = self.inverse_transform_row(&row)?;
        Ok(restored[0])
    }

    fn check_width(&self, actual: usize) -> Result<(), ForecastError> {
        if actual != self.n_features() {
            return Err(ForecastError::FeatureMismatch {
                expected: self.n_features(),
                actual,
            });
        }
        Ok(())
    }
}

/// A fixed-length ordered run of scaled feature rows.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureWindow {
    rows: Vec<Vec<f64>>,
}

impl FeatureWindow {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn last_row(&self) -> Option<&[f64]> {
        self.rows.last().map(|r| r.as_slice())
    }

    /// Row-major flattening used as regression input.
    pub fn flatten(&self) -> Vec<f64> {
        self.rows.iter().flatten().copied().collect()
    }

    /// Drop the oldest row and append `row`.
    pub fn slide(&mut self, row: Vec<f64>) {
        if !self.rows.is_empty() {
            self.rows.remove(0);
        }
        self.rows.push(row);
    }
}

/// Output of [`prepare`]: windows, their targets and the fitted transform.
#[derive(Debug, Clone)]
pub struct PreparedFeatures {
    pub columns: Vec<FeatureColumn>,
    pub scaler: MinMaxScaler,
    pub windows: Vec<FeatureWindow>,
    /// Scaled close of the row following each window
    pub targets: Vec<f64>,
}

/// Build overlapping windows over the full history.
///
/// The scaler is fitted once over the whole matrix. For each `i` from
/// `lookback` to the end, the window is rows `[i - lookback, i)` and the
/// target is the scaled close at row `i`.
pub fn prepare(bars: &[PriceBar], lookback: usize) -> Result<PreparedFeatures, ForecastError> {
    let required = lookback.max(1) + 1;
    if bars.len() < required {
        return Err(ForecastError::InsufficientData {
            required,
            available: bars.len(),
        });
    }

    let columns = present_columns(bars);
    let raw = feature_matrix(bars, &columns);
    let scaler = MinMaxScaler::fit(&raw).ok_or(ForecastError::InsufficientData {
        required,
        available: 0,
    })?;

    let scaled = raw
        .iter()
        .map(|row| scaler.transform_row(row))
        .collect::<Result<Vec<_>, _>>()?;

    let lookback = lookback.max(1);
    let mut windows = Vec::with_capacity(scaled.len() - lookback);
    let mut targets = Vec::with_capacity(scaled.len() - lookback);
    for i in lookback..scaled.len() {
        windows.push(FeatureWindow::new(scaled[i - lookback..i].to_vec()));
        targets.push(scaled[i][0]);
    }

    Ok(PreparedFeatures {
        columns,
        scaler,
        windows,
        targets,
    })
}
