//! Storage abstraction for the prediction ledger.
//!
//! The ledger is an append-only log: rows are only ever appended, and the
//! only rewrite allowed is the one that fills in evaluation fields. Calls are
//! blocking and assume a single writer at a time.
//!
//! # Example
//!
//! ```rust,no_run
//! use stockcast::domain::repositories::PredictionRepository;
//! use stockcast::infrastructure::persistence::CsvPredictionRepository;
//!
//! let repo = CsvPredictionRepository::open("data/predictions_history.csv").unwrap();
//! let rows = repo.load_all().unwrap();
//! println!("{} predictions on record", rows.len());
//! ```

use crate::domain::errors::LedgerError;
use crate::domain::prediction::PredictionRecord;

pub trait PredictionRepository: Send + Sync {
    /// All rows, in storage order.
    fn load_all(&self) -> Result<Vec<PredictionRecord>, LedgerError>;

    /// Durably append a single row.
    fn append(&self, record: &PredictionRecord) -> Result<(), LedgerError>;

    /// Replace the stored rows; used only to persist reconciliation.
    fn replace_all(&self, records: &[PredictionRecord]) -> Result<(), LedgerError>;
}
