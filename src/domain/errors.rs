use thiserror::Error;

/// A horizon label that does not match `<n>h` or `<n>d`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed horizon '{0}': expected <n>h or <n>d")]
pub struct MalformedHorizon(pub String);

/// Errors raised while building features, training or predicting
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    #[error("Insufficient data: need {required} rows, got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Models not trained yet")]
    NotTrained,

    #[error("Trained, but no sub-model is usable")]
    NoUsableModel,

    #[error("Seasonal model fit failed: {0}")]
    SeasonalFit(String),

    #[error("Window regression failed: {0}")]
    Regression(String),

    #[error("Horizon of {steps} daily steps exceeds the maximum of {max}")]
    HorizonTooLong { steps: usize, max: usize },

    #[error("Feature width mismatch: scaler fitted on {expected} columns, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },
}

/// Errors related to the prediction ledger
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    MalformedHorizon(#[from] MalformedHorizon),

    #[error("Invalid price for {symbol}: {price}")]
    InvalidPrice { symbol: String, price: f64 },

    #[error("Ledger storage failure: {0}")]
    Storage(String),
}

impl From<std::io::Error> for LedgerError {
    fn from(e: std::io::Error) -> Self {
        LedgerError::Storage(e.to_string())
    }
}

impl From<csv::Error> for LedgerError {
    fn from(e: csv::Error) -> Self {
        LedgerError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_data_formatting() {
        let err = ForecastError::InsufficientData {
            required: 160,
            available: 42,
        };

        let msg = err.to_string();
        assert!(msg.contains("160"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn test_malformed_horizon_converts_into_ledger_error() {
        let err: LedgerError = MalformedHorizon("5w".to_string()).into();
        assert!(matches!(err, LedgerError::MalformedHorizon(_)));
        assert!(err.to_string().contains("5w"));
    }
}
