// Window building and scaling shared by training and prediction
pub mod feature_builder;

// Trend + Fourier seasonality model
pub mod seasonal;

// Random forest over feature windows
pub mod window_regressor;

// Weighted combination of both models plus sentiment
pub mod forecaster;

pub use forecaster::{
    EnsembleForecaster, ForecasterConfig, ForecasterStatus, TrainingReport,
};
