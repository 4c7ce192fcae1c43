//! Additive trend + seasonality model for daily close series.
//!
//! `y(t) = trend(t) + weekly(t) + yearly(t) [+ daily(t)]`
//!
//! The trend is piecewise linear with hinge terms at fixed changepoints over
//! the first 80% of history. Seasonal components are Fourier series. All
//! coefficients are fitted jointly by ridge regression; each column is
//! multiplied by its prior scale beforehand, so the single ridge penalty acts
//! as a per-component prior. A small `changepoint_prior_scale` therefore
//! yields a stiff trend.

use crate::domain::errors::ForecastError;
use chrono::{DateTime, Duration, Utc};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::ridge_regression::{RidgeRegression, RidgeRegressionParameters};
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;
use tracing::debug;

const SECONDS_PER_DAY: f64 = 86_400.0;
const TREND_PRIOR_SCALE: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalConfig {
    pub daily_seasonality: bool,
    pub weekly_seasonality: bool,
    pub yearly_seasonality: bool,
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    pub n_changepoints: usize,
    /// Share of history in which changepoints may be placed
    pub changepoint_range: f64,
    /// Coverage of the confidence bounds
    pub interval_width: f64,
    pub ridge_alpha: f64,
}

impl Default for SeasonalConfig {
    fn default() -> Self {
        Self {
            daily_seasonality: true,
            weekly_seasonality: true,
            yearly_seasonality: true,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            n_changepoints: 25,
            changepoint_range: 0.8,
            interval_width: 0.8,
            ridge_alpha: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Seasonality {
    period_days: f64,
    order: usize,
}

/// Point forecast with lower/upper bounds, one entry per daily step.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalForecast {
    pub timestamps: Vec<DateTime<Utc>>,
    pub yhat: Vec<f64>,
    pub yhat_lower: Vec<f64>,
    pub yhat_upper: Vec<f64>,
}

/// A fitted trend + seasonality model.
#[derive(Debug, Clone)]
pub struct SeasonalModel {
    config: SeasonalConfig,
    start: DateTime<Utc>,
    last: DateTime<Utc>,
    span_days: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    seasonalities: Vec<Seasonality>,
    column_means: Vec<f64>,
    y_mean: f64,
    weights: Vec<f64>,
    intercept: f64,
    /// Residual standard deviation, price units
    sigma: f64,
    /// Mean absolute slope change per changepoint, price units per day
    mean_abs_delta: f64,
    /// Expected changepoints per day
    changepoint_rate: f64,
}

impl SeasonalModel {
    /// Fit on a `(timestamp, close)` series.
    pub fn fit(
        series: &[(DateTime<Utc>, f64)],
        config: &SeasonalConfig,
    ) -> Result<Self, ForecastError> {
        if series.len() < 2 {
            return Err(ForecastError::SeasonalFit(format!(
                "need at least 2 points, got {}",
                series.len()
            )));
        }
        if series.iter().any(|(_, y)| !y.is_finite()) {
            return Err(ForecastError::SeasonalFit("non-finite value in series".to_string()));
        }

        let start = series.iter().map(|(ts, _)| *ts).min().unwrap_or(series[0].0);
        let last = series.iter().map(|(ts, _)| *ts).max().unwrap_or(series[0].0);
        let span_days = (last - start).num_seconds() as f64 / SECONDS_PER_DAY;
        if span_days <= 0.0 {
            return Err(ForecastError::SeasonalFit("series spans zero time".to_string()));
        }

        let y_scale = series.iter().map(|(_, y)| y.abs()).fold(0.0, f64::max);
        if y_scale == 0.0 {
            return Err(ForecastError::SeasonalFit("series is all zeros".to_string()));
        }

        let n_changepoints = config.n_changepoints.min(series.len().saturating_sub(1));
        let changepoints: Vec<f64> = (1..=n_changepoints)
            .map(|j| config.changepoint_range * j as f64 / (n_changepoints + 1) as f64)
            .collect();

        let seasonalities = Self::seasonalities(series, config);

        let mut model = Self {
            config: config.clone(),
            start,
            last,
            span_days,
            y_scale,
            changepoints,
            seasonalities,
            column_means: Vec::new(),
            y_mean: 0.0,
            weights: Vec::new(),
            intercept: 0.0,
            sigma: 0.0,
            mean_abs_delta: 0.0,
            changepoint_rate: 0.0,
        };

        let raw: Vec<Vec<f64>> = series.iter().map(|(ts, _)| model.design_row(*ts)).collect();
        let y: Vec<f64> = series.iter().map(|(_, y)| y / y_scale).collect();
        let width = raw[0].len();

        let n = raw.len() as f64;
        model.column_means = (0..width)
            .map(|j| raw.iter().map(|r| r[j]).sum::<f64>() / n)
            .collect();
        model.y_mean = y.iter().sum::<f64>() / n;

        let centered: Vec<Vec<f64>> = raw.iter().map(|r| model.center(r)).collect();
        let y_centered: Vec<f64> = y.iter().map(|v| v - model.y_mean).collect();

        let x = DenseMatrix::from_2d_vec(&centered)
            .map_err(|e| ForecastError::SeasonalFit(format!("matrix creation failed: {}", e)))?;
        let params = RidgeRegressionParameters::default()
            .with_alpha(config.ridge_alpha)
            .with_normalize(false);
        let ridge: RidgeRegression<f64, f64, DenseMatrix<f64>, Vec<f64>> =
            RidgeRegression::fit(&x, &y_centered, params)
                .map_err(|e| ForecastError::SeasonalFit(format!("ridge fit failed: {}", e)))?;

        // Recover the linear coefficients by probing the origin and each unit vector
        let mut probe = vec![vec![0.0; width]];
        for j in 0..width {
            let mut row = vec![0.0; width];
            row[j] = 1.0;
            probe.push(row);
        }
        let probe = DenseMatrix::from_2d_vec(&probe)
            .map_err(|e| ForecastError::SeasonalFit(format!("matrix creation failed: {}", e)))?;
        let out = ridge
            .predict(&probe)
            .map_err(|e| ForecastError::SeasonalFit(format!("prediction failed: {}", e)))?;
        model.intercept = out[0];
        model.weights = out[1..].iter().map(|v| v - model.intercept).collect();

        if model.weights.iter().any(|w| !w.is_finite()) || !model.intercept.is_finite() {
            return Err(ForecastError::SeasonalFit("solver produced non-finite weights".to_string()));
        }

        let sq_err: f64 = series
            .iter()
            .map(|(ts, y)| (model.point(*ts) - y).powi(2))
            .sum();
        model.sigma = (sq_err / n).sqrt();

        if !model.changepoints.is_empty() {
            let deltas = &model.weights[1..1 + model.changepoints.len()];
            let mean_abs = deltas.iter().map(|d| d.abs()).sum::<f64>() / deltas.len() as f64;
            // Hinge columns were multiplied by the prior scale before fitting
            model.mean_abs_delta =
                mean_abs * config.changepoint_prior_scale * y_scale / span_days;
            model.changepoint_rate =
                model.changepoints.len() as f64 / (span_days * config.changepoint_range);
        }

        debug!(
            "Seasonal model fitted on {} points ({} columns, sigma {:.4})",
            series.len(),
            width,
            model.sigma
        );

        Ok(model)
    }

    fn seasonalities(series: &[(DateTime<Utc>, f64)], config: &SeasonalConfig) -> Vec<Seasonality> {
        let mut out = Vec::new();
        if config.weekly_seasonality {
            out.push(Seasonality {
                period_days: 7.0,
                order: 3,
            });
        }
        if config.yearly_seasonality {
            out.push(Seasonality {
                period_days: 365.25,
                order: 10,
            });
        }
        if config.daily_seasonality {
            if median_spacing_days(series) < 1.0 {
                out.push(Seasonality {
                    period_days: 1.0,
                    order: 4,
                });
            } else {
                debug!("Daily seasonality skipped: bars are not intraday");
            }
        }
        out
    }

    fn scaled_time(&self, ts: DateTime<Utc>) -> f64 {
        (ts - self.start).num_seconds() as f64 / SECONDS_PER_DAY / self.span_days
    }

    fn design_row(&self, ts: DateTime<Utc>) -> Vec<f64> {
        let t = self.scaled_time(ts);
        let mut row = Vec::with_capacity(1 + self.changepoints.len() + 2 * 13);
        row.push(t * TREND_PRIOR_SCALE);
        for cp in &self.changepoints {
            row.push((t - cp).max(0.0) * self.config.changepoint_prior_scale);
        }

        let epoch_days = ts.timestamp() as f64 / SECONDS_PER_DAY;
        for s in &self.seasonalities {
            for k in 1..=s.order {
                let angle = 2.0 * PI * k as f64 * epoch_days / s.period_days;
                row.push(angle.sin() * self.config.seasonality_prior_scale);
                row.push(angle.cos() * self.config.seasonality_prior_scale);
            }
        }
        row
    }

    fn center(&self, row: &[f64]) -> Vec<f64> {
        row.iter().zip(&self.column_means).map(|(v, m)| v - m).collect()
    }

    fn point(&self, ts: DateTime<Utc>) -> f64 {
        let row = self.center(&self.design_row(ts));
        let fitted: f64 = row.iter().zip(&self.weights).map(|(x, w)| x * w).sum();
        (fitted + self.intercept + self.y_mean) * self.y_scale
    }

    pub fn last_timestamp(&self) -> DateTime<Utc> {
        self.last
    }

    /// Forecast `steps` calendar days past the last observation.
    ///
    /// Bounds widen with the horizon: residual noise plus the slope drift
    /// expected from future changepoints.
    pub fn forecast(&self, steps: usize) -> Result<SeasonalForecast, ForecastError> {
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| ForecastError::SeasonalFit(format!("normal distribution: {}", e)))?;
        let z = normal.inverse_cdf(0.5 + self.config.interval_width / 2.0);

        let mut forecast = SeasonalForecast {
            timestamps: Vec::with_capacity(steps),
            yhat: Vec::with_capacity(steps),
            yhat_lower: Vec::with_capacity(steps),
            yhat_upper: Vec::with_capacity(steps),
        };

        for step in 1..=steps {
            let ts = i64::try_from(step)
                .ok()
                .and_then(|days| self.last.checked_add_signed(Duration::try_days(days)?))
                .ok_or_else(|| {
                    ForecastError::SeasonalFit(format!("forecast step {} is out of range", step))
                })?;
            let h = step as f64;
            let yhat = self.point(ts);
            let trend_sd = self.mean_abs_delta * (self.changepoint_rate * h).sqrt() * h;
            let half_width = z * (self.sigma.powi(2) + trend_sd.powi(2)).sqrt();

            forecast.timestamps.push(ts);
            forecast.yhat.push(yhat);
            forecast.yhat_lower.push(yhat - half_width);
            forecast.yhat_upper.push(yhat + half_width);
        }

        Ok(forecast)
    }
}

fn median_spacing_days(series: &[(DateTime<Utc>, f64)]) -> f64 {
    let mut gaps: Vec<f64> = series
        .windows(2)
        .map(|w| (w[1].0 - w[0].0).num_seconds() as f64 / SECONDS_PER_DAY)
        .filter(|g| *g > 0.0)
        .collect();
    if gaps.is_empty() {
        return f64::INFINITY;
    }
    gaps.sort_by(|a, b| a.total_cmp(b));
    gaps[gaps.len() / 2]
}
