//! Console tables for forecasts and ledger accuracy, plus JSON output.

use crate::application::prediction_service::{CycleReport, DashboardSession};
use crate::domain::prediction::{AccuracyStats, HorizonAccuracy, PredictionRecord};
use anyhow::{Context, Result};
use serde::Serialize;

fn opt(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Pretty-printed JSON for any report.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize report")
}

/// Reporter for prediction and accuracy output.
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerReporter;

impl LedgerReporter {
    pub fn print_cycle(&self, session: &DashboardSession, report: &CycleReport, symbols: &[String]) {
        println!("\n{}", "=".repeat(96));
        println!(
            "📈 PREDICTION CYCLE - {} processed, {} skipped, {} logged, {} reconciled",
            report.processed,
            report.skipped.len(),
            report.predictions_logged,
            report.reconciled
        );
        println!("{}", "=".repeat(96));
        println!(
            "{:<9} | {:>10} | {:<12} | {:>10} | {:>8} | {:<6} | {:<8}",
            "Symbol", "Price", "Sentiment", "Horizon", "Target", "Chg%", "Trend"
        );
        println!("{}", "-".repeat(96));

        for symbol in symbols {
            let Some(forecast) = session.forecasts.get(symbol) else {
                if let Some(reason) = session.failures.get(symbol) {
                    println!("{:<9} | ❌ {}", symbol, reason);
                }
                continue;
            };
            for (horizon, f) in &forecast.forecasts {
                println!(
                    "{:<9} | {:>10.4} | {:<12} | {:>10} | {:>8.4} | {:>+6.2} | {} {:<6}",
                    forecast.symbol,
                    forecast.current_price,
                    forecast.sentiment.trend.to_string(),
                    horizon.to_string(),
                    f.predicted_price,
                    f.change_pct,
                    f.trend.arrow(),
                    f.trend.to_string()
                );
            }
        }
        println!();
    }

    pub fn print_stats(&self, stats: &AccuracyStats) {
        println!("\n📊 Prediction accuracy");
        println!("  Total predictions:    {}", stats.total_predictions);
        println!("  Evaluated:            {}", stats.evaluated_predictions);
        println!("  Average error %:      {}", opt(stats.average_error_pct, 2));
        println!("  Median error %:       {}", opt(stats.median_error_pct, 2));
        println!("  Best error %:         {}", opt(stats.best_prediction_error, 2));
        println!("  Worst error %:        {}", opt(stats.worst_prediction_error, 2));
        println!("  Correct direction %:  {}", opt(stats.correct_direction_pct, 1));
        println!();
    }

    pub fn print_by_horizon(&self, rows: &[HorizonAccuracy]) {
        if rows.is_empty() {
            println!("\nNo evaluated predictions yet.\n");
            return;
        }

        println!(
            "\n{:<8} | {:>6} | {:>8} | {:>8} | {:>8} | {:>8} | {:>8}",
            "Horizon", "Count", "Avg%", "Median%", "Best%", "Worst%", "Dir%"
        );
        println!("{}", "-".repeat(72));
        for row in rows {
            println!(
                "{:<8} | {:>6} | {:>8.2} | {:>8.2} | {:>8.2} | {:>8.2} | {:>8.1}",
                row.horizon.to_string(),
                row.count,
                row.average_error_pct,
                row.median_error_pct,
                row.best_prediction_error,
                row.worst_prediction_error,
                row.correct_direction_pct
            );
        }
        println!();
    }

    pub fn print_history(&self, records: &[PredictionRecord]) {
        println!(
            "\n{:<19} | {:<9} | {:>3} | {:>10} | {:>10} | {:>10} | {:>7}",
            "Predicted at", "Symbol", "H", "Current", "Predicted", "Actual", "Err%"
        );
        println!("{}", "-".repeat(84));
        for r in records {
            println!(
                "{:<19} | {:<9} | {:>3} | {:>10.4} | {:>10.4} | {:>10} | {:>7}",
                r.prediction_timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                r.symbol,
                r.horizon.to_string(),
                r.current_price,
                r.predicted_price,
                opt(r.actual_price, 4),
                opt(r.error_pct, 2)
            );
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::horizon::Horizon;

    #[test]
    fn test_missing_values_render_as_na() {
        assert_eq!(opt(None, 2), "N/A");
        assert_eq!(opt(Some(1.23456), 2), "1.23");
    }

    #[test]
    fn test_horizon_rows_serialize_with_labels() {
        let rows = vec![HorizonAccuracy {
            horizon: Horizon::Days(3),
            count: 2,
            average_error_pct: 1.5,
            median_error_pct: 1.5,
            best_prediction_error: 1.0,
            worst_prediction_error: 2.0,
            correct_direction_pct: 50.0,
        }];
        let value: serde_json::Value = serde_json::from_str(&to_json(&rows).unwrap()).unwrap();
        assert_eq!(value[0]["horizon"], "3d");
        assert_eq!(value[0]["count"], 2);

        LedgerReporter.print_by_horizon(&rows);
        LedgerReporter.print_by_horizon(&[]);
    }

    #[test]
    fn test_stats_json_keeps_absent_fields_null() {
        let json = to_json(&AccuracyStats::unevaluated(4)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["total_predictions"], 4);
        assert!(value["average_error_pct"].is_null());
    }
}
