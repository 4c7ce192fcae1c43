//! Forecaster configuration parsing from environment variables.

use super::parse_env;
use crate::application::ml::ForecasterConfig;
use crate::application::ml::seasonal::SeasonalConfig;
use crate::application::ml::window_regressor::RegressorConfig;
use anyhow::{Result, bail};

/// Ensemble forecaster environment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ForecasterEnvConfig {
    pub lookback: usize,
    pub rf_n_trees: usize,
    pub rf_max_depth: u16,
    pub rf_seed: u64,
    pub changepoint_prior_scale: f64,
    pub seasonal_weight: f64,
    pub regression_weight: f64,
    pub sentiment_max_adjustment: f64,
    pub daily_seasonality: bool,
    pub weekly_seasonality: bool,
    pub yearly_seasonality: bool,
}

impl ForecasterEnvConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            lookback: parse_env("LOOKBACK", 60)?,
            rf_n_trees: parse_env("RF_N_TREES", 100)?,
            rf_max_depth: parse_env("RF_MAX_DEPTH", 15)?,
            rf_seed: parse_env("RF_SEED", 42)?,
            changepoint_prior_scale: parse_env("CHANGEPOINT_PRIOR_SCALE", 0.05)?,
            seasonal_weight: parse_env("SEASONAL_WEIGHT", 0.6)?,
            regression_weight: parse_env("REGRESSION_WEIGHT", 0.4)?,
            sentiment_max_adjustment: parse_env("SENTIMENT_MAX_ADJUSTMENT", 0.02)?,
            daily_seasonality: parse_env("DAILY_SEASONALITY", true)?,
            weekly_seasonality: parse_env("WEEKLY_SEASONALITY", true)?,
            yearly_seasonality: parse_env("YEARLY_SEASONALITY", true)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.lookback == 0 {
            bail!("LOOKBACK must be at least 1");
        }
        if self.rf_n_trees == 0 {
            bail!("RF_N_TREES must be at least 1");
        }
        if self.seasonal_weight < 0.0 || self.regression_weight < 0.0 {
            bail!(
                "Model weights must be non-negative (seasonal {}, regression {})",
                self.seasonal_weight,
                self.regression_weight
            );
        }
        if self.changepoint_prior_scale <= 0.0 {
            bail!("CHANGEPOINT_PRIOR_SCALE must be positive");
        }
        Ok(())
    }

    pub fn to_forecaster_config(&self) -> ForecasterConfig {
        ForecasterConfig {
            lookback: self.lookback,
            seasonal: SeasonalConfig {
                daily_seasonality: self.daily_seasonality,
                weekly_seasonality: self.weekly_seasonality,
                yearly_seasonality: self.yearly_seasonality,
                changepoint_prior_scale: self.changepoint_prior_scale,
                ..SeasonalConfig::default()
            },
            regressor: RegressorConfig {
                n_trees: self.rf_n_trees,
                max_depth: self.rf_max_depth,
                seed: self.rf_seed,
                ..RegressorConfig::default()
            },
            seasonal_weight: self.seasonal_weight,
            regression_weight: self.regression_weight,
            sentiment_max_adjustment: self.sentiment_max_adjustment,
            ..ForecasterConfig::default()
        }
    }
}
