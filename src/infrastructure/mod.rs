pub mod csv_market_data;
pub mod mock;
pub mod news;
pub mod persistence;

pub use csv_market_data::CsvMarketDataProvider;
pub use mock::MockMarketDataProvider;
pub use persistence::{CsvPredictionRepository, InMemoryPredictionRepository};
