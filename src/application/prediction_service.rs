//! One prediction cycle over a watch-list.
//!
//! Per symbol: quote, reconcile the ledger with it, fetch and enrich
//! history, train, score news, forecast every horizon and log the final step
//! of each forecast. A symbol that fails is logged and skipped; the cycle
//! carries on with the next one.

use crate::application::indicators::{self, TradingSignals};
use crate::application::ml::{EnsembleForecaster, ForecasterConfig, TrainingReport};
use crate::application::prediction_ledger::PredictionLedger;
use crate::config::Stock;
use crate::domain::horizon::Horizon;
use crate::domain::market::{Quote, last_close};
use crate::domain::ports::{MarketDataProvider, NewsProvider};
use crate::domain::prediction::{PredictionRequest, PredictionResult, PriceTrend, percent_change};
use crate::domain::repositories::PredictionRepository;
use crate::domain::sentiment::SentimentSummary;
use crate::infrastructure::news::sentiment_analyzer::{DEFAULT_BASE_WEIGHT, SentimentAnalyzer};
use anyhow::{Result, bail};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Forecast for one horizon, as reported to the user.
#[derive(Debug, Clone, Serialize)]
pub struct HorizonForecast {
    pub result: PredictionResult,
    pub predicted_price: f64,
    pub change_pct: f64,
    pub trend: PriceTrend,
}

/// Everything produced for one symbol in a cycle.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolForecast {
    pub symbol: String,
    pub name: String,
    pub quote: Option<Quote>,
    pub current_price: f64,
    pub sentiment: SentimentSummary,
    pub sentiment_weight: f64,
    pub signals: TradingSignals,
    #[serde(skip)]
    pub training: Option<TrainingReport>,
    pub forecasts: BTreeMap<Horizon, HorizonForecast>,
}

/// State owned by the caller across cycles.
#[derive(Debug, Clone)]
pub struct DashboardSession {
    pub forecasts: HashMap<String, SymbolForecast>,
    pub failures: HashMap<String, String>,
    pub last_update: Option<DateTime<Utc>>,
    pub next_refresh: Option<DateTime<Utc>>,
    pub refresh_interval: Duration,
    pub auto_refresh: bool,
    pub update_in_progress: bool,
}

impl Default for DashboardSession {
    fn default() -> Self {
        Self {
            forecasts: HashMap::new(),
            failures: HashMap::new(),
            last_update: None,
            next_refresh: None,
            refresh_interval: Duration::minutes(5),
            auto_refresh: true,
            update_in_progress: false,
        }
    }
}

impl DashboardSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// True before the first cycle and, with auto refresh on, once the
    /// refresh time has passed. With auto refresh off, later cycles only run
    /// on request.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        match (self.last_update, self.next_refresh) {
            (None, _) => true,
            _ if !self.auto_refresh => false,
            (Some(_), Some(next)) => now >= next,
            (Some(last), None) => now - last >= self.refresh_interval,
        }
    }

    fn finish(&mut self, now: DateTime<Utc>) {
        self.last_update = Some(now);
        self.next_refresh = self.auto_refresh.then(|| now + self.refresh_interval);
        self.update_in_progress = false;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub processed: usize,
    pub skipped: Vec<String>,
    pub predictions_logged: usize,
    pub reconciled: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSettings {
    pub forecaster: ForecasterConfig,
    pub history_days: u32,
    pub horizons: Vec<Horizon>,
    pub news_lookback_days: u32,
    pub max_news_per_stock: usize,
    pub sentiment_base_weight: f64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            forecaster: ForecasterConfig::default(),
            history_days: 730,
            horizons: Horizon::defaults(),
            news_lookback_days: 7,
            max_news_per_stock: 20,
            sentiment_base_weight: DEFAULT_BASE_WEIGHT,
        }
    }
}

pub struct PredictionService<R: PredictionRepository> {
    market: Arc<dyn MarketDataProvider>,
    news: Arc<dyn NewsProvider>,
    analyzer: SentimentAnalyzer,
    ledger: PredictionLedger<R>,
    settings: ServiceSettings,
}

impl<R: PredictionRepository> PredictionService<R> {
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        news: Arc<dyn NewsProvider>,
        ledger: PredictionLedger<R>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            market,
            news,
            analyzer: SentimentAnalyzer::new(),
            ledger,
            settings,
        }
    }

    pub fn ledger(&self) -> &PredictionLedger<R> {
        &self.ledger
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Run one full cycle over `stocks`, storing results in `session`.
    pub async fn run_cycle(&self, session: &mut DashboardSession, stocks: &[Stock]) -> CycleReport {
        let mut report = CycleReport::default();
        if session.update_in_progress {
            warn!("Prediction cycle already in progress, skipping");
            return report;
        }
        session.update_in_progress = true;

        info!("Starting prediction cycle for {} stocks", stocks.len());
        for (idx, stock) in stocks.iter().enumerate() {
            info!("Processing {} ({}/{})...", stock.symbol, idx + 1, stocks.len());
            match self.process_symbol(stock, &mut report).await {
                Ok(forecast) => {
                    session.failures.remove(&stock.symbol);
                    session.forecasts.insert(stock.symbol.clone(), forecast);
                    report.processed += 1;
                }
                Err(e) => {
                    warn!("Skipping {}: {:#}", stock.symbol, e);
                    session.failures.insert(stock.symbol.clone(), format!("{:#}", e));
                    report.skipped.push(stock.symbol.clone());
                }
            }
        }

        session.finish(Utc::now());
        info!(
            "Prediction cycle complete: {} processed, {} skipped, {} predictions logged",
            report.processed,
            report.skipped.len(),
            report.predictions_logged
        );
        report
    }

    async fn process_symbol(&self, stock: &Stock, report: &mut CycleReport) -> Result<SymbolForecast> {
        let symbol = stock.symbol.as_str();

        let quote = self.market.get_quote(symbol).await.unwrap_or_else(|e| {
            warn!("Quote unavailable for {}: {:#}", symbol, e);
            None
        });

        if let Some(q) = &quote {
            let prices = HashMap::from([(symbol.to_string(), q.current_price)]);
            match self.ledger.reconcile(&prices) {
                Ok(n) => report.reconciled += n,
                Err(e) => error!("Reconciliation failed for {}: {}", symbol, e),
            }
        }

        let bars = self
            .market
            .get_historical_bars(symbol, self.settings.history_days)
            .await?;
        if bars.is_empty() {
            bail!("No data available for {}", symbol);
        }
        let bars = indicators::enrich(&bars);

        let mut forecaster = EnsembleForecaster::new(self.settings.forecaster.clone());
        let training = forecaster.train_default(&bars)?;

        let mut news = self
            .news
            .get_news(symbol, self.settings.news_lookback_days)
            .await
            .unwrap_or_else(|e| {
                warn!("News unavailable for {}: {:#}", symbol, e);
                Vec::new()
            });
        news.truncate(self.settings.max_news_per_stock);
        let sentiment = self.analyzer.score_batch(&news);
        let sentiment_weight =
            SentimentAnalyzer::weight_for(&sentiment, self.settings.sentiment_base_weight);

        let current_price = match quote.as_ref().map(|q| q.current_price).or(last_close(&bars)) {
            Some(price) => price,
            None => bail!("No current price for {}", symbol),
        };

        let mut forecasts = BTreeMap::new();
        for horizon in &self.settings.horizons {
            let request = PredictionRequest::for_horizon(*horizon, sentiment_weight);
            let result = match forecaster.predict(&bars, request) {
                Ok(result) => result,
                Err(e) => {
                    warn!("No {} forecast for {}: {}", horizon, symbol, e);
                    continue;
                }
            };
            let Some(predicted_price) = result.final_price() else {
                continue;
            };

            match self.ledger.log_prediction(
                symbol,
                &stock.name,
                current_price,
                &horizon.to_string(),
                predicted_price,
            ) {
                Ok(_) => report.predictions_logged += 1,
                Err(e) => error!("Could not log {} prediction for {}: {}", horizon, symbol, e),
            }

            forecasts.insert(
                *horizon,
                HorizonForecast {
                    predicted_price,
                    change_pct: percent_change(current_price, predicted_price),
                    trend: PriceTrend::classify(
                        current_price,
                        predicted_price,
                        PriceTrend::DEFAULT_THRESHOLD_PCT,
                    ),
                    result,
                },
            );
        }

        Ok(SymbolForecast {
            symbol: symbol.to_string(),
            name: stock.name.clone(),
            quote,
            current_price,
            sentiment,
            sentiment_weight,
            signals: indicators::trading_signals(&bars),
            training: Some(training),
            forecasts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_session_refresh_schedule() {
        let t = Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap();
        let mut session = DashboardSession::new();
        assert!(session.needs_refresh(t));

        session.update_in_progress = true;
        session.finish(t);
        assert!(!session.update_in_progress);
        assert!(!session.needs_refresh(t + Duration::minutes(4)));
        assert!(session.needs_refresh(t + Duration::minutes(5)));

        session.auto_refresh = false;
        session.finish(t);
        assert_eq!(session.next_refresh, None);
        assert!(!session.needs_refresh(t + Duration::minutes(6)));
        assert!(!session.needs_refresh(t + Duration::days(1)));

        session.auto_refresh = true;
        assert!(session.needs_refresh(t + Duration::minutes(6)));
    }
}
