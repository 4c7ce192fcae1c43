// Domain-specific error types
pub mod errors;

// Forecast horizon labels
pub mod horizon;

// Bars, quotes and news
pub mod market;

// Port interfaces
pub mod ports;

// Ledger rows, accuracy and forecast results
pub mod prediction;

// Repository traits
pub mod repositories;

// News sentiment types
pub mod sentiment;
