//! In-memory prediction ledger storage, for tests and dry runs.
//!
//! Data is lost when the process exits.

use crate::domain::errors::LedgerError;
use crate::domain::prediction::PredictionRecord;
use crate::domain::repositories::PredictionRepository;
use std::sync::{Mutex, MutexGuard};

pub struct InMemoryPredictionRepository {
    records: Mutex<Vec<PredictionRecord>>,
}

impl InMemoryPredictionRepository {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<PredictionRecord>>, LedgerError> {
        self.records
            .lock()
            .map_err(|e| LedgerError::Storage(format!("ledger lock poisoned: {}", e)))
    }
}

impl Default for InMemoryPredictionRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl PredictionRepository for InMemoryPredictionRepository {
    fn load_all(&self) -> Result<Vec<PredictionRecord>, LedgerError> {
        Ok(self.lock()?.clone())
    }

    fn append(&self, record: &PredictionRecord) -> Result<(), LedgerError> {
        self.lock()?.push(record.clone());
        Ok(())
    }

    fn replace_all(&self, records: &[PredictionRecord]) -> Result<(), LedgerError> {
        *self.lock()? = records.to_vec();
        Ok(())
    }
}
