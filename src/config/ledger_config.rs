//! Prediction ledger location.

use std::env;
use std::path::PathBuf;

pub const LEDGER_FILE_NAME: &str = "predictions_history.csv";

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEnvConfig {
    pub data_dir: PathBuf,
}

impl LedgerEnvConfig {
    pub fn from_env() -> Self {
        Self {
            data_dir: PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string())),
        }
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(LEDGER_FILE_NAME)
    }
}
