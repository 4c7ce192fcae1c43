//! stockcast - forecast the watch-list and track prediction accuracy
//!
//! # Usage
//! ```sh
//! cargo run --bin stockcast -- cycle
//! cargo run --bin stockcast -- cycle --prices-dir ./prices
//! cargo run --bin stockcast -- stats --symbol ENI.MI --horizon 1d
//! cargo run --bin stockcast -- reconcile ENI.MI=14.52 RACE.MI=418.2
//! ```
//!
//! # Environment Variables
//! See `config/` for the full list (`LOOKBACK`, `SYMBOLS`, `HORIZONS`,
//! `DATA_DIR`, ...). `RUST_LOG` controls log verbosity.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::sync::Arc;
use stockcast::application::prediction_ledger::PredictionLedger;
use stockcast::application::prediction_service::{
    DashboardSession, PredictionService, ServiceSettings,
};
use stockcast::application::reporting::{LedgerReporter, to_json};
use stockcast::config::{Config, WatchlistEnvConfig};
use stockcast::domain::horizon::Horizon;
use stockcast::domain::ports::MarketDataProvider;
use stockcast::infrastructure::csv_market_data::CsvMarketDataProvider;
use stockcast::infrastructure::mock::MockMarketDataProvider;
use stockcast::infrastructure::news::mock_news::MockNewsProvider;
use stockcast::infrastructure::persistence::CsvPredictionRepository;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "Stock price forecasting with accuracy tracking", long_about = None)]
struct Cli {
    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one prediction cycle over the watch-list
    Cycle {
        /// Directory of `{SYMBOL}.csv` price files (synthetic data when omitted)
        #[arg(long)]
        prices_dir: Option<String>,

        /// Comma-separated symbols, overriding SYMBOLS
        #[arg(short, long)]
        symbols: Option<String>,

        /// Seed for synthetic data
        #[arg(long, default_value = "42")]
        seed: u64,
    },
    /// Overall prediction accuracy
    Stats {
        #[arg(short, long)]
        symbol: Option<String>,

        /// Horizon label such as 2h or 3d
        #[arg(long)]
        horizon: Option<String>,
    },
    /// Accuracy per horizon
    ByHorizon,
    /// Most recent predictions
    History {
        #[arg(short, long)]
        symbol: Option<String>,

        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Evaluate due predictions against SYMBOL=PRICE pairs
    Reconcile {
        #[arg(required = true)]
        prices: Vec<String>,
    },
}

fn parse_price_pairs(pairs: &[String]) -> Result<HashMap<String, f64>> {
    pairs
        .iter()
        .map(|pair| {
            let Some((symbol, price)) = pair.split_once('=') else {
                bail!("Expected SYMBOL=PRICE, got '{}'", pair);
            };
            if symbol.trim().is_empty() {
                bail!("Missing symbol in '{}'", pair);
            }
            let price = price
                .trim()
                .parse::<f64>()
                .context(format!("Invalid price in '{}'", pair))?;
            Ok((symbol.trim().to_uppercase(), price))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Setup logging
    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: {} stocks, horizons {:?}, ledger {:?}",
        config.watchlist.stocks.len(),
        config.watchlist.horizons,
        config.ledger.ledger_path()
    );

    let ledger = PredictionLedger::new(CsvPredictionRepository::open(config.ledger.ledger_path())?);
    let reporter = LedgerReporter;

    match cli.command {
        Commands::Cycle {
            prices_dir,
            symbols,
            seed,
        } => {
            let market: Arc<dyn MarketDataProvider> = match prices_dir {
                Some(dir) => {
                    info!("Reading prices from {}", dir);
                    Arc::new(CsvMarketDataProvider::new(dir))
                }
                None => {
                    info!("Using synthetic market data (seed {})", seed);
                    Arc::new(MockMarketDataProvider::new(seed))
                }
            };
            let news = Arc::new(
                MockNewsProvider::new().with_max_items(config.news.max_news_per_stock),
            );

            let stocks = match symbols {
                Some(raw) => WatchlistEnvConfig::parse_symbols(&raw),
                None => config.watchlist.stocks.clone(),
            };

            let settings = ServiceSettings {
                forecaster: config.forecaster.to_forecaster_config(),
                history_days: config.watchlist.history_days,
                horizons: config.watchlist.horizons.clone(),
                news_lookback_days: config.news.lookback_days,
                max_news_per_stock: config.news.max_news_per_stock,
                sentiment_base_weight: config.news.sentiment_weight,
            };
            let service = PredictionService::new(market, news, ledger, settings);

            let mut session = DashboardSession::new();
            let report = service.run_cycle(&mut session, &stocks).await;

            if cli.json {
                let ordered: Vec<_> = stocks
                    .iter()
                    .filter_map(|s| session.forecasts.get(&s.symbol))
                    .collect();
                println!("{}", to_json(&ordered)?);
            } else {
                let symbols: Vec<String> = stocks.iter().map(|s| s.symbol.clone()).collect();
                reporter.print_cycle(&session, &report, &symbols);
            }
        }
        Commands::Stats { symbol, horizon } => {
            let horizon = horizon
                .map(|h| h.parse::<Horizon>())
                .transpose()
                .context("Invalid --horizon")?;
            let stats = ledger.accuracy_stats(symbol.as_deref(), horizon)?;
            if cli.json {
                println!("{}", to_json(&stats)?);
            } else {
                reporter.print_stats(&stats);
            }
        }
        Commands::ByHorizon => {
            let rows = ledger.accuracy_by_horizon()?;
            if cli.json {
                println!("{}", to_json(&rows)?);
            } else {
                reporter.print_by_horizon(&rows);
            }
        }
        Commands::History { symbol, limit } => {
            let records = ledger.history(symbol.as_deref(), limit)?;
            if cli.json {
                println!("{}", to_json(&records)?);
            } else {
                reporter.print_history(&records);
            }
        }
        Commands::Reconcile { prices } => {
            let prices = parse_price_pairs(&prices)?;
            let updated = ledger.reconcile(&prices)?;
            if cli.json {
                println!("{}", to_json(&serde_json::json!({ "updated": updated }))?);
            } else {
                println!("✅ Updated {} predictions with actual values", updated);
            }
        }
    }

    Ok(())
}
