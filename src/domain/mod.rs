// Market data domain (klines, candles, intervals)
pub mod market;

// Model feature contract and prediction records
pub mod ml;

// Port interfaces
pub mod ports;

// Repository traits
pub mod repositories;

// Data quality checks
pub mod validation;

// Domain-specific error types
pub mod errors;
