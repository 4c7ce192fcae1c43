use chrono::{TimeZone, Utc};
use std::sync::Arc;
use stockcast::application::indicators;
use stockcast::application::ml::{EnsembleForecaster, ForecasterConfig, ForecasterStatus};
use stockcast::application::ml::window_regressor::RegressorConfig;
use stockcast::application::prediction_ledger::PredictionLedger;
use stockcast::application::prediction_service::{
    DashboardSession, PredictionService, ServiceSettings,
};
use stockcast::config::Stock;
use stockcast::domain::horizon::Horizon;
use stockcast::domain::prediction::PredictionRequest;
use stockcast::infrastructure::csv_market_data::CsvMarketDataProvider;
use stockcast::infrastructure::mock::MockMarketDataProvider;
use stockcast::infrastructure::news::MockNewsProvider;
use stockcast::infrastructure::persistence::InMemoryPredictionRepository;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("stockcast=debug")
        .try_init();
}

fn small_forecaster() -> ForecasterConfig {
    ForecasterConfig {
        lookback: 30,
        regressor: RegressorConfig {
            n_trees: 10,
            max_depth: 8,
            ..RegressorConfig::default()
        },
        ..ForecasterConfig::default()
    }
}

#[test]
fn test_two_years_of_bars_forecast_a_week() {
    init_tracing();
    let end = Utc.with_ymd_and_hms(2025, 3, 14, 20, 0, 0).unwrap();
    let bars = MockMarketDataProvider::new(42).with_end(end).bars("ENI.MI", 730);
    let last_close = bars.last().unwrap().close;

    let mut forecaster = EnsembleForecaster::new(small_forecaster());
    let report = forecaster.train_default(&bars).unwrap();
    assert_eq!(report.rows, bars.len());
    assert!(report.seasonal || report.regression);
    assert!(matches!(forecaster.status(), ForecasterStatus::Ready { .. }));

    let result = forecaster
        .predict(&bars, PredictionRequest::for_horizon(Horizon::Days(7), 0.0))
        .unwrap();

    assert_eq!(result.horizon, Horizon::Days(7));
    assert_eq!(result.predictions.len(), 7);
    assert!(result
        .predictions
        .iter()
        .all(|p| p.is_finite() && (p - last_close).abs() < last_close * 0.5));
    assert_eq!(result.model_weights.sentiment, 0.0);
}

#[test]
fn test_indicator_enriched_bars_still_train() {
    let end = Utc.with_ymd_and_hms(2025, 3, 14, 20, 0, 0).unwrap();
    let bars = MockMarketDataProvider::new(3).with_end(end).bars("RACE.MI", 730);
    let enriched = indicators::enrich(&bars);
    assert_eq!(enriched.len(), bars.len());

    let mut forecaster = EnsembleForecaster::new(small_forecaster());
    forecaster.train_default(&enriched).unwrap();
    let result = forecaster
        .predict(&enriched, PredictionRequest::for_horizon(Horizon::Hours(2), 0.5))
        .unwrap();
    assert_eq!(result.predictions.len(), 1);
}

fn settings() -> ServiceSettings {
    ServiceSettings {
        forecaster: small_forecaster(),
        horizons: vec![Horizon::Days(1), Horizon::Days(3)],
        ..ServiceSettings::default()
    }
}

#[tokio::test]
async fn test_cycle_logs_one_prediction_per_horizon() {
    init_tracing();
    let service = PredictionService::new(
        Arc::new(MockMarketDataProvider::new(42)),
        Arc::new(MockNewsProvider::new()),
        PredictionLedger::new(InMemoryPredictionRepository::new()),
        settings(),
    );
    let stocks = vec![Stock::from_symbol("ENI.MI"), Stock::from_symbol("ENEL.MI")];

    let mut session = DashboardSession::new();
    let report = service.run_cycle(&mut session, &stocks).await;

    assert_eq!(report.processed, 2);
    assert!(report.skipped.is_empty());
    assert_eq!(report.predictions_logged, 4);
    assert_eq!(report.reconciled, 0);
    assert_eq!(service.ledger().repository().len(), 4);

    let eni = &session.forecasts["ENI.MI"];
    assert_eq!(eni.name, "Eni S.p.A.");
    assert_eq!(eni.forecasts.len(), 2);
    assert!(eni.sentiment.total_articles > 0);
    assert!(!session.update_in_progress);
    assert!(session.last_update.is_some());

    let history = service.ledger().history(Some("ENEL.MI"), 10).unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|r| !r.accuracy_evaluated));
}

#[tokio::test]
async fn test_symbols_without_data_are_skipped() {
    let missing_dir = std::env::temp_dir().join(format!(
        "stockcast_no_prices_{}",
        std::process::id()
    ));
    let service = PredictionService::new(
        Arc::new(CsvMarketDataProvider::new(missing_dir)),
        Arc::new(MockNewsProvider::new()),
        PredictionLedger::new(InMemoryPredictionRepository::new()),
        settings(),
    );

    let mut session = DashboardSession::new();
    let report = service
        .run_cycle(&mut session, &[Stock::from_symbol("ENI.MI")])
        .await;

    assert_eq!(report.processed, 0);
    assert_eq!(report.skipped, vec!["ENI.MI".to_string()]);
    assert!(session.failures["ENI.MI"].contains("No data"));
    assert!(service.ledger().repository().is_empty());
}
