//! Ensemble forecaster: a trend/seasonality model and a window regression
//! model, blended and nudged by news sentiment.
//!
//! ```text
//!   Untrained ──train()──▶ Trained(models) ──train()──▶ Trained(new models)
//! ```
//!
//! A training call builds a complete [`TrainedModels`] and swaps it in with a
//! single assignment. If the call fails before that point (short history,
//! no usable windows), the previous state is left exactly as it was. A
//! sub-model that fails to fit is recorded as absent; prediction then uses
//! whichever branch is available.

use super::feature_builder::{
    self, FeatureColumn, FeatureWindow, MinMaxScaler, feature_matrix, present_columns,
};
use super::seasonal::{SeasonalConfig, SeasonalForecast, SeasonalModel};
use super::window_regressor::{RegressorConfig, WindowRegressor};
use crate::domain::errors::ForecastError;
use crate::domain::horizon::Horizon;
use crate::domain::market::PriceBar;
use crate::domain::prediction::{ModelWeights, PredictionRequest, PredictionResult};
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct ForecasterConfig {
    pub lookback: usize,
    /// Rows required beyond `lookback` before training is attempted
    pub min_training_rows: usize,
    pub seasonal: SeasonalConfig,
    pub regressor: RegressorConfig,
    pub seasonal_weight: f64,
    pub regression_weight: f64,
    /// Largest sentiment move, as a fraction of the last close
    pub sentiment_max_adjustment: f64,
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            lookback: 60,
            min_training_rows: 100,
            seasonal: SeasonalConfig::default(),
            regressor: RegressorConfig::default(),
            seasonal_weight: 0.6,
            regression_weight: 0.4,
            sentiment_max_adjustment: 0.02,
        }
    }
}

/// Everything produced by one successful training call.
pub struct TrainedModels {
    seasonal: Option<SeasonalModel>,
    regressor: Option<WindowRegressor>,
    scaler: MinMaxScaler,
    columns: Vec<FeatureColumn>,
    lookback: usize,
}

pub enum ForecasterState {
    Untrained,
    Trained(TrainedModels),
}

/// Externally visible readiness of the forecaster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecasterStatus {
    Untrained,
    Ready { seasonal: bool, regression: bool },
    /// Training completed but neither sub-model could be fitted
    NoUsableModel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingReport {
    pub rows: usize,
    pub windows: usize,
    pub columns: usize,
    pub seasonal: bool,
    pub regression: bool,
}

pub struct EnsembleForecaster {
    config: ForecasterConfig,
    state: ForecasterState,
}

impl EnsembleForecaster {
    pub fn new(config: ForecasterConfig) -> Self {
        Self {
            config,
            state: ForecasterState::Untrained,
        }
    }

    pub fn config(&self) -> &ForecasterConfig {
        &self.config
    }

    pub fn status(&self) -> ForecasterStatus {
        match &self.state {
            ForecasterState::Untrained => ForecasterStatus::Untrained,
            ForecasterState::Trained(models) => {
                match (models.seasonal.is_some(), models.regressor.is_some()) {
                    (false, false) => ForecasterStatus::NoUsableModel,
                    (seasonal, regression) => ForecasterStatus::Ready {
                        seasonal,
                        regression,
                    },
                }
            }
        }
    }

    pub fn is_trained(&self) -> bool {
        matches!(self.state, ForecasterState::Trained(_))
    }

    /// Train both sub-models on `bars` with the configured lookback.
    pub fn train_default(&mut self, bars: &[PriceBar]) -> Result<TrainingReport, ForecastError> {
        self.train(bars, self.config.lookback)
    }

    /// Train both sub-models, replacing all previously fitted state.
    pub fn train(
        &mut self,
        bars: &[PriceBar],
        lookback: usize,
    ) -> Result<TrainingReport, ForecastError> {
        let required = lookback + self.config.min_training_rows;
        if bars.len() < required {
            error!(
                "Insufficient data for training: {} rows, need {}",
                bars.len(),
                required
            );
            return Err(ForecastError::InsufficientData {
                required,
                available: bars.len(),
            });
        }

        info!("Starting model training on {} rows...", bars.len());

        let prepared = feature_builder::prepare(bars, lookback).map_err(|e| {
            error!("No data prepared for training: {}", e);
            e
        })?;
        if prepared.windows.is_empty() {
            error!("No data prepared for training");
            return Err(ForecastError::InsufficientData {
                required,
                available: 0,
            });
        }

        let series: Vec<_> = bars.iter().map(|b| (b.timestamp, b.close)).collect();
        let seasonal = match SeasonalModel::fit(&series, &self.config.seasonal) {
            Ok(model) => {
                info!("Seasonal model trained successfully");
                Some(model)
            }
            Err(e) => {
                error!("Error training seasonal model: {}", e);
                None
            }
        };

        let regressor =
            match WindowRegressor::fit(&prepared.windows, &prepared.targets, &self.config.regressor)
            {
                Ok(model) => Some(model),
                Err(e) => {
                    error!("Error training Random Forest: {}", e);
                    None
                }
            };

        let report = TrainingReport {
            rows: bars.len(),
            windows: prepared.windows.len(),
            columns: prepared.columns.len(),
            seasonal: seasonal.is_some(),
            regression: regressor.is_some(),
        };

        self.state = ForecasterState::Trained(TrainedModels {
            seasonal,
            regressor,
            scaler: prepared.scaler,
            columns: prepared.columns,
            lookback,
        });

        if report.seasonal || report.regression {
            info!(
                "Training complete (seasonal: {}, random forest: {})",
                report.seasonal, report.regression
            );
        } else {
            warn!("Training complete but no sub-model is usable");
        }

        Ok(report)
    }

    /// Forecast the requested horizon from the latest bars.
    pub fn predict(
        &self,
        bars: &[PriceBar],
        request: PredictionRequest,
    ) -> Result<PredictionResult, ForecastError> {
        let models = match &self.state {
            ForecasterState::Trained(models) => models,
            ForecasterState::Untrained => {
                error!("Models not trained yet");
                return Err(ForecastError::NotTrained);
            }
        };

        if models.seasonal.is_none() && models.regressor.is_none() {
            error!("Prediction requested but no sub-model is usable");
            return Err(ForecastError::NoUsableModel);
        }

        let horizon = request.horizon();
        let steps = horizon.forecast_steps();
        if steps > Horizon::MAX_FORECAST_STEPS {
            error!("Horizon {} is too long to forecast", horizon);
            return Err(ForecastError::HorizonTooLong {
                steps,
                max: Horizon::MAX_FORECAST_STEPS,
            });
        }

        let seasonal: Option<SeasonalForecast> =
            models
                .seasonal
                .as_ref()
                .and_then(|model| match model.forecast(steps) {
                    Ok(forecast) => Some(forecast),
                    Err(e) => {
                        error!("Error in seasonal prediction: {}", e);
                        None
                    }
                });

        let regression: Option<Vec<f64>> =
            models
                .regressor
                .as_ref()
                .and_then(|regressor| match Self::regression_branch(models, regressor, bars, steps) {
                    Ok(values) => Some(values),
                    Err(e) => {
                        warn!("Random Forest branch skipped: {}", e);
                        None
                    }
                });

        let (mut predictions, bounds, mut model_weights) = match (seasonal, regression) {
            (Some(s), Some(r)) => {
                let blended = s
                    .yhat
                    .iter()
                    .zip(&r)
                    .map(|(sv, rv)| self.config.seasonal_weight * sv + self.config.regression_weight * rv)
                    .collect();
                let weights = ModelWeights {
                    seasonal: Some(self.config.seasonal_weight),
                    regression: Some(self.config.regression_weight),
                    sentiment: 0.0,
                };
                (blended, Some((s.yhat_lower, s.yhat_upper)), weights)
            }
            (Some(s), None) => {
                let weights = ModelWeights {
                    seasonal: Some(1.0),
                    regression: None,
                    sentiment: 0.0,
                };
                (s.yhat, Some((s.yhat_lower, s.yhat_upper)), weights)
            }
            (None, Some(r)) => {
                let weights = ModelWeights {
                    seasonal: None,
                    regression: Some(1.0),
                    sentiment: 0.0,
                };
                (r, None, weights)
            }
            (None, None) => {
                error!("No sub-model produced a forecast for {}", horizon);
                return Err(ForecastError::NoUsableModel);
            }
        };

        if request.sentiment_weight != 0.0 {
            match bars.last() {
                Some(last) => {
                    let adjustment = last.close
                        * request.sentiment_weight.clamp(-1.0, 1.0)
                        * self.config.sentiment_max_adjustment;
                    predictions.iter_mut().for_each(|p| *p += adjustment);
                    model_weights.sentiment = request.sentiment_weight.abs();
                }
                None => warn!("Sentiment adjustment skipped: no last close available"),
            }
        }

        let (confidence_lower, confidence_upper) = match bounds {
            Some((lower, upper)) => (Some(lower), Some(upper)),
            None => (None, None),
        };

        Ok(PredictionResult {
            horizon,
            predictions,
            confidence_lower,
            confidence_upper,
            model_weights,
        })
    }

    /// Scale the latest window with the trained scaler, roll the forest
    /// forward and map the scaled closes back to prices.
    fn regression_branch(
        models: &TrainedModels,
        regressor: &WindowRegressor,
        bars: &[PriceBar],
        steps: usize,
    ) -> Result<Vec<f64>, ForecastError> {
        let columns = present_columns(bars);
        if columns != models.columns {
            return Err(ForecastError::FeatureMismatch {
                expected: models.columns.len(),
                actual: columns.len(),
            });
        }

        if bars.len() < models.lookback {
            return Err(ForecastError::InsufficientData {
                required: models.lookback,
                available: bars.len(),
            });
        }

        let tail = &bars[bars.len() - models.lookback..];
        let rows = feature_matrix(tail, &models.columns)
            .iter()
            .map(|row| models.scaler.transform_row(row))
            .collect::<Result<Vec<_>, _>>()?;

        let scaled = regressor.forecast(&FeatureWindow::new(rows), steps)?;

        scaled
            .into_iter()
            .map(|v| models.scaler.inverse_close(v, models.columns.len()))
            .collect()
    }
}

impl Default for EnsembleForecaster {
    fn default() -> Self {
        Self::new(ForecasterConfig::default())
    }
}
