use crate::domain::errors::LedgerError;
use crate::domain::prediction::{LEDGER_COLUMNS, PredictionRecord};
use crate::domain::repositories::PredictionRepository;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prediction ledger stored as a single CSV file with a header row.
pub struct CsvPredictionRepository {
    file_path: PathBuf,
}

impl CsvPredictionRepository {
    /// Open the ledger at `path`, creating the directory and a header-only
    /// file when it does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let file_path = path.as_ref().to_path_buf();

        if let Some(parent) = file_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)?;
        }

        let needs_header = match fs::metadata(&file_path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };
        if needs_header {
            let mut wtr = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&file_path)?;
            wtr.write_record(LEDGER_COLUMNS)?;
            wtr.flush()?;
            info!("Created prediction ledger at {:?}", file_path);
        }

        Ok(Self { file_path })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

impl PredictionRepository for CsvPredictionRepository {
    fn load_all(&self) -> Result<Vec<PredictionRecord>, LedgerError> {
        if !self.file_path.exists() {
            return Ok(Vec::new());
        }

        let mut rdr = csv::Reader::from_path(&self.file_path)?;
        let records = rdr
            .deserialize()
            .collect::<Result<Vec<PredictionRecord>, _>>()?;

        debug!("Loaded {} predictions from {:?}", records.len(), self.file_path);
        Ok(records)
    }

    fn append(&self, record: &PredictionRecord) -> Result<(), LedgerError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        wtr.serialize(record)?;
        wtr.flush()?;
        Ok(())
    }

    fn replace_all(&self, records: &[PredictionRecord]) -> Result<(), LedgerError> {
        // Atomic write: write to temp file then rename
        let temp_path = self.file_path.with_extension("csv.tmp");
        {
            let mut wtr = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&temp_path)?;
            wtr.write_record(LEDGER_COLUMNS)?;
            for record in records {
                wtr.serialize(record)?;
            }
            wtr.flush()?;
        }
        fs::rename(&temp_path, &self.file_path)?;

        debug!("Rewrote {} predictions to {:?}", records.len(), self.file_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::horizon::Horizon;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn create_test_dir() -> PathBuf {
        let unique_id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!(
            "stockcast_test_{}_{}_{}_ledger",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0),
            unique_id
        ))
    }

    fn cleanup_test_dir(temp_dir: PathBuf) {
        fs::remove_dir_all(temp_dir).ok();
    }

    fn record(symbol: &str, horizon: Horizon) -> PredictionRecord {
        let ts = Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap();
        PredictionRecord {
            prediction_timestamp: ts,
            symbol: symbol.to_string(),
            stock_name: "Eni S.p.A.".to_string(),
            current_price: 14.2,
            horizon,
            target_timestamp: ts + horizon.duration(),
            predicted_price: 14.5,
            predicted_change_pct: 2.112_676_056_338_028,
            actual_price: None,
            actual_change_pct: None,
            error_pct: None,
            accuracy_evaluated: false,
        }
    }

    #[test]
    fn test_open_creates_directory_and_header() {
        let dir = create_test_dir();
        let path = dir.join("nested").join("predictions_history.csv");

        let repo = CsvPredictionRepository::open(&path).unwrap();
        let content = fs::read_to_string(repo.path()).unwrap();
        assert_eq!(content.trim_end(), LEDGER_COLUMNS.join(","));
        assert!(repo.load_all().unwrap().is_empty());

        cleanup_test_dir(dir);
    }

    #[test]
    fn test_append_keeps_single_header() {
        let dir = create_test_dir();
        let path = dir.join("predictions_history.csv");

        let repo = CsvPredictionRepository::open(&path).unwrap();
        repo.append(&record("ENI.MI", Horizon::Days(1))).unwrap();
        repo.append(&record("ENI.MI", Horizon::Hours(2))).unwrap();

        // Reopening an existing ledger must not add a second header
        let repo = CsvPredictionRepository::open(&path).unwrap();
        repo.append(&record("ENI.MI", Horizon::Days(7))).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("prediction_timestamp").count(), 1);

        let rows = repo.load_all().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].horizon, Horizon::Hours(2));
        assert_eq!(rows[1].target_timestamp - rows[1].prediction_timestamp, Duration::hours(2));

        cleanup_test_dir(dir);
    }

    #[test]
    fn test_replace_all_persists_evaluation() {
        let dir = create_test_dir();
        let repo = CsvPredictionRepository::open(dir.join("predictions_history.csv")).unwrap();
        repo.append(&record("ENI.MI", Horizon::Days(1))).unwrap();
        repo.append(&record("UCG.MI", Horizon::Days(3))).unwrap();

        let mut rows = repo.load_all().unwrap();
        rows[0].actual_price = Some(14.4);
        rows[0].actual_change_pct = Some(1.408_450_704_225_352);
        rows[0].error_pct = Some(0.694_444_444_444_444);
        rows[0].accuracy_evaluated = true;
        repo.replace_all(&rows).unwrap();

        let reloaded = repo.load_all().unwrap();
        assert_eq!(reloaded, rows);
        assert!(!dir.join("predictions_history.csv.tmp").exists());

        cleanup_test_dir(dir);
    }

    #[test]
    fn test_reads_rows_written_by_other_tools() {
        let dir = create_test_dir();
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("predictions_history.csv");
        fs::write(
            &path,
            format!(
                "{}\n\
                 2025-01-15 10:00:00,ENI.MI,Eni S.p.A.,14.2,1d,2025-01-16 10:00:00,14.5,2.11,14.4,1.41,0.69,True\n\
                 2025-01-15 10:00:00,ENI.MI,Eni S.p.A.,14.2,7d,2025-01-22 10:00:00,14.9,4.93,,,,False\n",
                LEDGER_COLUMNS.join(",")
            ),
        )
        .unwrap();

        let repo = CsvPredictionRepository::open(&path).unwrap();
        let rows = repo.load_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].accuracy_evaluated);
        assert_eq!(rows[0].actual_price, Some(14.4));
        assert!(!rows[1].accuracy_evaluated);
        assert_eq!(rows[1].error_pct, None);

        cleanup_test_dir(dir);
    }
}
