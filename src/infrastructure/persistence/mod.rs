pub mod csv_prediction_repository;
pub mod in_memory;

pub use csv_prediction_repository::CsvPredictionRepository;
pub use in_memory::InMemoryPredictionRepository;
