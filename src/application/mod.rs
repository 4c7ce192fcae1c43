// Technical indicators and trading signals
pub mod indicators;

// Forecasting models
pub mod ml;

// Prediction history and accuracy
pub mod prediction_ledger;

// Prediction cycle orchestration
pub mod prediction_service;

// Console and JSON output
pub mod reporting;
