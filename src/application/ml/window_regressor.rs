use super::feature_builder::FeatureWindow;
use crate::domain::errors::ForecastError;
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct RegressorConfig {
    pub n_trees: usize,
    pub max_depth: u16,
    pub min_samples_split: usize,
    /// Fixed seed so repeated training on the same data gives the same forest
    pub seed: u64,
}

impl Default for RegressorConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 15,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

/// Random forest over flattened feature windows, predicting the next scaled close.
pub struct WindowRegressor {
    model: RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>,
    input_width: usize,
}

impl WindowRegressor {
    pub fn fit(
        windows: &[FeatureWindow],
        targets: &[f64],
        config: &RegressorConfig,
    ) -> Result<Self, ForecastError> {
        if windows.is_empty() || windows.len() != targets.len() {
            return Err(ForecastError::Regression(format!(
                "{} windows for {} targets",
                windows.len(),
                targets.len()
            )));
        }

        let x: Vec<Vec<f64>> = windows.iter().map(|w| w.flatten()).collect();
        let input_width = x[0].len();
        if input_width == 0 || x.iter().any(|row| row.len() != input_width) {
            return Err(ForecastError::Regression("ragged or empty windows".to_string()));
        }

        let x_matrix = DenseMatrix::from_2d_vec(&x)
            .map_err(|e| ForecastError::Regression(format!("Matrix creation failed: {}", e)))?;

        let params = RandomForestRegressorParameters::default()
            .with_n_trees(config.n_trees)
            .with_max_depth(config.max_depth)
            .with_min_samples_split(config.min_samples_split)
            .with_seed(config.seed);

        debug!(
            "Training Random Forest Regressor (Trees: {}, Depth: {}) on {} windows of width {}",
            config.n_trees,
            config.max_depth,
            x.len(),
            input_width
        );

        let model = RandomForestRegressor::fit(&x_matrix, &targets.to_vec(), params)
            .map_err(|e| ForecastError::Regression(format!("Training error: {}", e)))?;

        info!("Random Forest model trained on {} windows", x.len());
        Ok(Self { model, input_width })
    }

    /// Predict the scaled close following `window`.
    pub fn predict_next(&self, window: &FeatureWindow) -> Result<f64, ForecastError> {
        let input = window.flatten();
        if input.len() != self.input_width {
            return Err(ForecastError::FeatureMismatch {
                expected: self.input_width,
                actual: input.len(),
            });
        }

        let input_matrix = DenseMatrix::from_2d_vec(&vec![input])
            .map_err(|e| ForecastError::Regression(format!("Matrix creation failed: {}", e)))?;

        let predictions = self
            .model
            .predict(&input_matrix)
            .map_err(|e| ForecastError::Regression(format!("Prediction failed: {}", e)))?;

        predictions
            .first()
            .copied()
            .ok_or_else(|| ForecastError::Regression("No prediction returned".to_string()))
    }

    /// Recursive multi-step forecast of scaled closes.
    ///
    /// After each step the window drops its oldest row and appends a copy of
    /// its newest row with the close slot replaced by the prediction.
    pub fn forecast(&self, window: &FeatureWindow, steps: usize) -> Result<Vec<f64>, ForecastError> {
        let mut current = window.clone();
        let mut predictions = Vec::with_capacity(steps);

        for _ in 0..steps {
            let next = self.predict_next(&current)?;
            predictions.push(next);

            let mut row = current
                .last_row()
                .map(|r| r.to_vec())
                .ok_or_else(|| ForecastError::Regression("empty window".to_string()))?;
            row[0] = next;
            current.slide(row);
        }

        Ok(predictions)
    }

    pub fn input_width(&self) -> usize {
        self.input_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> RegressorConfig {
        RegressorConfig {
            n_trees: 10,
            max_depth: 6,
            ..Default::default()
        }
    }

    fn ramp_windows(n: usize, lookback: usize) -> (Vec<FeatureWindow>, Vec<f64>) {
        let series: Vec<f64> = (0..n + lookback).map(|i| i as f64 / (n + lookback) as f64).collect();
        let windows = (0..n)
            .map(|i| FeatureWindow::new(series[i..i + lookback].iter().map(|v| vec![*v, 0.5]).collect()))
            .collect();
        let targets = (0..n).map(|i| series[i + lookback]).collect();
        (windows, targets)
    }

    #[test]
    fn test_fit_and_predict_in_unit_range() {
        let (windows, targets) = ramp_windows(120, 5);
        let model = WindowRegressor::fit(&windows, &targets, &small_config()).unwrap();
        assert_eq!(model.input_width(), 10);

        let p = model.predict_next(&windows[60]).unwrap();
        assert!((0.0..=1.0).contains(&p));
        assert!((p - targets[60]).abs() < 0.1);
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let (windows, targets) = ramp_windows(80, 5);
        let a = WindowRegressor::fit(&windows, &targets, &small_config()).unwrap();
        let b = WindowRegressor::fit(&windows, &targets, &small_config()).unwrap();
        assert_eq!(
            a.forecast(&windows[79], 3).unwrap(),
            b.forecast(&windows[79], 3).unwrap()
        );
    }

    #[test]
    fn test_forecast_length() {
        let (windows, targets) = ramp_windows(80, 5);
        let model = WindowRegressor::fit(&windows, &targets, &small_config()).unwrap();
        assert_eq!(model.forecast(&windows[10], 7).unwrap().len(), 7);
    }

    #[test]
    fn test_width_mismatch() {
        let (windows, targets) = ramp_windows(50, 5);
        let model = WindowRegressor::fit(&windows, &targets, &small_config()).unwrap();
        let narrow = FeatureWindow::new(vec![vec![0.1]; 5]);
        assert!(matches!(
            model.predict_next(&narrow),
            Err(ForecastError::FeatureMismatch { expected: 10, actual: 5 })
        ));
    }

    #[test]
    fn test_mismatched_targets_fail() {
        let (windows, _) = ramp_windows(20, 5);
        assert!(WindowRegressor::fit(&windows, &[0.5; 3], &small_config()).is_err());
        assert!(WindowRegressor::fit(&[], &[], &small_config()).is_err());
    }
}
