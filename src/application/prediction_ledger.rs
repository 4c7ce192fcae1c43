//! Prediction ledger: logs forecasts, reconciles them against realized
//! prices once their target time has passed, and reports accuracy.
//!
//! Rows are append-only. Reconciliation is the only rewrite and it touches
//! nothing but the three evaluation fields and the evaluated flag. A single
//! writer at a time is assumed.

use crate::domain::errors::{LedgerError, MalformedHorizon};
use crate::domain::horizon::Horizon;
use crate::domain::prediction::{AccuracyStats, HorizonAccuracy, PredictionRecord, percent_change};
use crate::domain::repositories::PredictionRepository;
use chrono::{DateTime, SubsecRound, Utc};
use statrs::statistics::{Data, Distribution, Max, Median, Min};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, error, info, warn};

pub struct PredictionLedger<R: PredictionRepository> {
    repository: R,
}

/// Error metrics over a non-empty set of evaluated rows.
struct ErrorSummary {
    count: usize,
    mean: f64,
    median: f64,
    best: f64,
    worst: f64,
    correct_direction_pct: f64,
}

impl ErrorSummary {
    fn from_records(records: &[&PredictionRecord]) -> Option<Self> {
        let errors: Vec<f64> = records.iter().filter_map(|r| r.error_pct).collect();
        if errors.is_empty() {
            return None;
        }

        let correct = records
            .iter()
            .filter(|r| r.direction_correct() == Some(true))
            .count();

        let data = Data::new(errors);
        Some(Self {
            count: records.len(),
            mean: data.mean()?,
            median: data.median(),
            best: data.min(),
            worst: data.max(),
            correct_direction_pct: correct as f64 / records.len() as f64 * 100.0,
        })
    }
}

fn is_evaluated(record: &PredictionRecord) -> bool {
    record.accuracy_evaluated && record.error_pct.is_some()
}

impl<R: PredictionRepository> PredictionLedger<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Log a prediction made now. See [`Self::log_prediction_at`].
    pub fn log_prediction(
        &self,
        symbol: &str,
        stock_name: &str,
        current_price: f64,
        horizon: &str,
        predicted_price: f64,
    ) -> Result<PredictionRecord, LedgerError> {
        self.log_prediction_at(
            symbol,
            stock_name,
            current_price,
            horizon,
            predicted_price,
            Utc::now(),
        )
    }

    /// Append one unevaluated row targeting `now + horizon`.
    ///
    /// A malformed horizon or an unusable current price appends nothing.
    pub fn log_prediction_at(
        &self,
        symbol: &str,
        stock_name: &str,
        current_price: f64,
        horizon: &str,
        predicted_price: f64,
        now: DateTime<Utc>,
    ) -> Result<PredictionRecord, LedgerError> {
        let horizon: Horizon = horizon.parse().map_err(|e| {
            error!("Error logging prediction for {}: {}", symbol, e);
            LedgerError::from(e)
        })?;

        if !current_price.is_finite() || current_price <= 0.0 {
            error!(
                "Error logging prediction for {}: invalid current price {}",
                symbol, current_price
            );
            return Err(LedgerError::InvalidPrice {
                symbol: symbol.to_string(),
                price: current_price,
            });
        }

        // Whole seconds, so the stored target stays exactly one horizon away
        let prediction_timestamp = now.trunc_subsecs(0);
        let Some(target_timestamp) = prediction_timestamp.checked_add_signed(horizon.duration())
        else {
            error!(
                "Error logging prediction for {}: horizon {} is out of range",
                symbol, horizon
            );
            return Err(MalformedHorizon(horizon.to_string()).into());
        };

        let record = PredictionRecord {
            prediction_timestamp,
            symbol: symbol.to_string(),
            stock_name: stock_name.to_string(),
            current_price,
            horizon,
            target_timestamp,
            predicted_price,
            predicted_change_pct: percent_change(current_price, predicted_price),
            actual_price: None,
            actual_change_pct: None,
            error_pct: None,
            accuracy_evaluated: false,
        };

        self.repository.append(&record).map_err(|e| {
            error!("Error logging prediction for {}: {}", symbol, e);
            e
        })?;

        info!(
            "Prediction logged: {} {} -> {:.4} (target {})",
            symbol, horizon, predicted_price, record.target_timestamp
        );
        Ok(record)
    }

    /// Evaluate every due row whose symbol has a price. See [`Self::reconcile_at`].
    pub fn reconcile(&self, prices: &HashMap<String, f64>) -> Result<usize, LedgerError> {
        self.reconcile_at(prices, Utc::now())
    }

    /// Fill the evaluation fields of rows with `target_timestamp <= now`.
    ///
    /// Rows whose symbol is missing from `prices` (or priced at zero or
    /// below) are left for a later call. Returns the number of rows updated.
    pub fn reconcile_at(
        &self,
        prices: &HashMap<String, f64>,
        now: DateTime<Utc>,
    ) -> Result<usize, LedgerError> {
        let mut records = self.repository.load_all()?;
        let mut updated = 0;

        for record in records.iter_mut().filter(|r| r.is_due(now)) {
            let Some(&actual) = prices.get(&record.symbol) else {
                continue;
            };
            if !actual.is_finite() || actual <= 0.0 {
                warn!(
                    "Skipping reconciliation of {}: invalid price {}",
                    record.symbol, actual
                );
                continue;
            }

            record.actual_price = Some(actual);
            record.actual_change_pct = Some(percent_change(record.current_price, actual));
            record.error_pct = Some((actual - record.predicted_price).abs() / actual * 100.0);
            record.accuracy_evaluated = true;
            updated += 1;
        }

        if updated > 0 {
            self.repository.replace_all(&records).map_err(|e| {
                error!("Error updating predictions: {}", e);
                e
            })?;
            info!("Updated {} predictions with actual values", updated);
        } else {
            debug!("No predictions due for reconciliation");
        }

        Ok(updated)
    }

    /// Accuracy over rows matching the optional filters.
    pub fn accuracy_stats(
        &self,
        symbol: Option<&str>,
        horizon: Option<Horizon>,
    ) -> Result<AccuracyStats, LedgerError> {
        let records = self.repository.load_all()?;
        let matching: Vec<&PredictionRecord> = records
            .iter()
            .filter(|r| symbol.is_none_or(|s| r.symbol == s))
            .filter(|r| horizon.is_none_or(|h| r.horizon == h))
            .collect();

        let evaluated: Vec<&PredictionRecord> =
            matching.iter().copied().filter(|r| is_evaluated(r)).collect();

        let Some(summary) = ErrorSummary::from_records(&evaluated) else {
            return Ok(AccuracyStats::unevaluated(matching.len()));
        };

        Ok(AccuracyStats {
            total_predictions: matching.len(),
            evaluated_predictions: summary.count,
            average_error_pct: Some(summary.mean),
            median_error_pct: Some(summary.median),
            best_prediction_error: Some(summary.best),
            worst_prediction_error: Some(summary.worst),
            correct_direction_pct: Some(summary.correct_direction_pct),
        })
    }

    /// One row per horizon that has evaluated predictions, shortest first.
    pub fn accuracy_by_horizon(&self) -> Result<Vec<HorizonAccuracy>, LedgerError> {
        let records = self.repository.load_all()?;

        let mut groups: BTreeMap<Horizon, Vec<&PredictionRecord>> = BTreeMap::new();
        for record in records.iter().filter(|r| is_evaluated(r)) {
            groups.entry(record.horizon).or_default().push(record);
        }

        Ok(groups
            .into_iter()
            .filter_map(|(horizon, group)| {
                ErrorSummary::from_records(&group).map(|s| HorizonAccuracy {
                    horizon,
                    count: s.count,
                    average_error_pct: s.mean,
                    median_error_pct: s.median,
                    best_prediction_error: s.best,
                    worst_prediction_error: s.worst,
                    correct_direction_pct: s.correct_direction_pct,
                })
            })
            .collect())
    }

    /// Most recent predictions first, optionally for one symbol.
    pub fn history(
        &self,
        symbol: Option<&str>,
        limit: usize,
    ) -> Result<Vec<PredictionRecord>, LedgerError> {
        let mut records: Vec<PredictionRecord> = self
            .repository
            .load_all()?
            .into_iter()
            .filter(|r| symbol.is_none_or(|s| r.symbol == s))
            .collect();

        records.sort_by(|a, b| b.prediction_timestamp.cmp(&a.prediction_timestamp));
        records.truncate(limit);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::InMemoryPredictionRepository;
    use chrono::{Duration, TimeZone};

    fn ledger() -> PredictionLedger<InMemoryPredictionRepository> {
        PredictionLedger::new(InMemoryPredictionRepository::new())
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap()
    }

    fn prices(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(s, p)| (s.to_string(), *p)).collect()
    }

    #[test]
    fn test_target_is_exactly_one_horizon_ahead() {
        let ledger = ledger();
        let now = t0() + Duration::milliseconds(730);

        let day = ledger
            .log_prediction_at("ENI.MI", "Eni S.p.A.", 14.0, "1d", 14.2, now)
            .unwrap();
        assert_eq!(day.target_timestamp - day.prediction_timestamp, Duration::hours(24));
        assert_eq!(day.prediction_timestamp, t0());

        let hours = ledger
            .log_prediction_at("ENI.MI", "Eni S.p.A.", 14.0, "2h", 14.1, now)
            .unwrap();
        assert_eq!(hours.target_timestamp - hours.prediction_timestamp, Duration::hours(2));
        assert_eq!(ledger.repository().len(), 2);
    }

    #[test]
    fn test_predicted_change_and_empty_evaluation_fields() {
        let ledger = ledger();
        let record = ledger
            .log_prediction_at("X", "X Corp", 100.0, "3d", 105.0, t0())
            .unwrap();
        assert!((record.predicted_change_pct - 5.0).abs() < 1e-12);
        assert_eq!(record.actual_price, None);
        assert_eq!(record.actual_change_pct, None);
        assert_eq!(record.error_pct, None);
        assert!(!record.accuracy_evaluated);
    }

    #[test]
    fn test_malformed_horizon_appends_nothing() {
        let ledger = ledger();
        for bad in ["2w", "", "d", "1.5d", "-1h", "1 d", "99999999999d", "4000000000d"] {
            let err = ledger
                .log_prediction_at("X", "X Corp", 100.0, bad, 101.0, t0())
                .unwrap_err();
            assert!(matches!(err, LedgerError::MalformedHorizon(_)), "{}", bad);
        }
        assert_eq!(ledger.repository().len(), 0);
    }

    #[test]
    fn test_zero_horizon_targets_prediction_time() {
        let ledger = ledger();
        let record = ledger
            .log_prediction_at("X", "X Corp", 100.0, "0h", 101.0, t0())
            .unwrap();
        assert_eq!(record.horizon, Horizon::Hours(0));
        assert_eq!(record.target_timestamp, record.prediction_timestamp);

        let prices = HashMap::from([("X".to_string(), 102.0)]);
        assert_eq!(ledger.reconcile_at(&prices, t0()).unwrap(), 1);
    }

    #[test]
    fn test_invalid_current_price_appends_nothing() {
        let ledger = ledger();
        assert!(matches!(
            ledger.log_prediction_at("X", "X Corp", 0.0, "1d", 1.0, t0()),
            Err(LedgerError::InvalidPrice { .. })
        ));
        assert!(ledger
            .log_prediction_at("X", "X Corp", f64::NAN, "1d", 1.0, t0())
            .is_err());
        assert_eq!(ledger.repository().len(), 0);
    }

    #[test]
    fn test_reconcile_fills_evaluation_fields_once() {
        let ledger = ledger();
        ledger
            .log_prediction_at("X", "X Corp", 100.0, "1d", 105.0, t0())
            .unwrap();

        let later = t0() + Duration::days(2);
        let updated = ledger.reconcile_at(&prices(&[("X", 103.0)]), later).unwrap();
        assert_eq!(updated, 1);

        let record = &ledger.history(None, 10).unwrap()[0];
        assert_eq!(record.actual_price, Some(103.0));
        assert!((record.actual_change_pct.unwrap() - 3.0).abs() < 1e-9);
        // |103 - 105| / 103 * 100
        assert!((record.error_pct.unwrap() - 1.941_747_572_815_534).abs() < 1e-9);
        assert!(record.accuracy_evaluated);

        let again = ledger.reconcile_at(&prices(&[("X", 90.0)]), later).unwrap();
        assert_eq!(again, 0);
        assert_eq!(ledger.history(None, 10).unwrap()[0].actual_price, Some(103.0));
    }

    #[test]
    fn test_reconcile_skips_future_and_unpriced_rows() {
        let ledger = ledger();
        ledger
            .log_prediction_at("X", "X Corp", 100.0, "1d", 101.0, t0())
            .unwrap();
        ledger
            .log_prediction_at("Y", "Y Corp", 50.0, "1d", 49.0, t0())
            .unwrap();
        ledger
            .log_prediction_at("X", "X Corp", 100.0, "7d", 110.0, t0())
            .unwrap();

        let now = t0() + Duration::days(1);
        assert_eq!(ledger.reconcile_at(&prices(&[("X", 102.0)]), now).unwrap(), 1);

        // Y was deferred, not dropped
        assert_eq!(ledger.reconcile_at(&prices(&[("Y", 48.0)]), now).unwrap(), 1);
        assert_eq!(
            ledger
                .reconcile_at(&prices(&[("X", 102.0), ("Y", 48.0)]), now)
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_reconcile_boundary_is_inclusive() {
        let ledger = ledger();
        let record = ledger
            .log_prediction_at("X", "X Corp", 10.0, "2h", 11.0, t0())
            .unwrap();

        let just_before = record.target_timestamp - Duration::seconds(1);
        assert_eq!(ledger.reconcile_at(&prices(&[("X", 10.5)]), just_before).unwrap(), 0);
        assert_eq!(
            ledger
                .reconcile_at(&prices(&[("X", 10.5)]), record.target_timestamp)
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_stats_without_evaluations_are_absent() {
        let ledger = ledger();
        ledger
            .log_prediction_at("X", "X Corp", 100.0, "1d", 101.0, t0())
            .unwrap();

        let stats = ledger.accuracy_stats(None, None).unwrap();
        assert_eq!(stats.total_predictions, 1);
        assert_eq!(stats.evaluated_predictions, 0);
        assert_eq!(stats.average_error_pct, None);
        assert_eq!(stats.median_error_pct, None);
        assert_eq!(stats.correct_direction_pct, None);

        assert!(ledger.accuracy_by_horizon().unwrap().is_empty());
    }

    #[test]
    fn test_stats_filters_and_metrics() {
        let ledger = ledger();
        // error 1%
        ledger
            .log_prediction_at("X", "X Corp", 100.0, "1d", 101.0, t0())
            .unwrap();
        // error 3%
        ledger
            .log_prediction_at("X", "X Corp", 100.0, "1d", 103.0, t0())
            .unwrap();
        ledger
            .log_prediction_at("X", "X Corp", 100.0, "3d", 97.0, t0())
            .unwrap();
        ledger
            .log_prediction_at("Y", "Y Corp", 10.0, "1d", 10.5, t0())
            .unwrap();

        ledger
            .reconcile_at(&prices(&[("X", 100.0)]), t0() + Duration::days(1))
            .unwrap();

        let stats = ledger.accuracy_stats(Some("X"), None).unwrap();
        assert_eq!(stats.total_predictions, 3);
        assert_eq!(stats.evaluated_predictions, 2);
        assert!((stats.average_error_pct.unwrap() - 2.0).abs() < 1e-9);
        assert!((stats.median_error_pct.unwrap() - 2.0).abs() < 1e-9);
        assert!((stats.best_prediction_error.unwrap() - 1.0).abs() < 1e-9);
        assert!((stats.worst_prediction_error.unwrap() - 3.0).abs() < 1e-9);
        // Actual change is 0: neither positive prediction matches its sign
        assert_eq!(stats.correct_direction_pct, Some(0.0));

        let by_horizon = ledger.accuracy_stats(Some("X"), Some(Horizon::Days(3))).unwrap();
        assert_eq!(by_horizon.total_predictions, 1);
        assert_eq!(by_horizon.evaluated_predictions, 0);

        let y = ledger.accuracy_stats(Some("Y"), None).unwrap();
        assert_eq!(y.total_predictions, 1);
        assert_eq!(y.average_error_pct, None);
    }

    #[test]
    fn test_direction_accuracy() {
        let ledger = ledger();
        ledger
            .log_prediction_at("X", "X Corp", 100.0, "1d", 104.0, t0())
            .unwrap();
        ledger
            .log_prediction_at("X", "X Corp", 100.0, "1d", 96.0, t0())
            .unwrap();
        ledger
            .reconcile_at(&prices(&[("X", 102.0)]), t0() + Duration::days(1))
            .unwrap();

        let stats = ledger.accuracy_stats(None, None).unwrap();
        assert_eq!(stats.correct_direction_pct, Some(50.0));
    }

    #[test]
    fn test_accuracy_by_horizon_groups_evaluated_rows() {
        let ledger = ledger();
        for (h, p) in [("1d", 101.0), ("1d", 99.0), ("2h", 100.5), ("7d", 120.0)] {
            ledger
                .log_prediction_at("X", "X Corp", 100.0, h, p, t0())
                .unwrap();
        }
        ledger
            .reconcile_at(&prices(&[("X", 100.0)]), t0() + Duration::days(1))
            .unwrap();

        let table = ledger.accuracy_by_horizon().unwrap();
        let labels: Vec<String> = table.iter().map(|r| r.horizon.to_string()).collect();
        assert_eq!(labels, vec!["2h", "1d"]);
        assert_eq!(table[1].count, 2);
        assert!((table[1].average_error_pct - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_history_is_newest_first_and_limited() {
        let ledger = ledger();
        for i in 0..5 {
            let symbol = if i % 2 == 0 { "X" } else { "Y" };
            ledger
                .log_prediction_at(symbol, "n/a", 10.0, "1d", 10.0 + i as f64, t0() + Duration::hours(i))
                .unwrap();
        }

        let all = ledger.history(None, 3).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].prediction_timestamp, t0() + Duration::hours(4));
        assert!(all.windows(2).all(|w| w[0].prediction_timestamp >= w[1].prediction_timestamp));

        let x = ledger.history(Some("X"), 50).unwrap();
        assert_eq!(x.len(), 3);
        assert!(x.iter().all(|r| r.symbol == "X"));
    }
}
