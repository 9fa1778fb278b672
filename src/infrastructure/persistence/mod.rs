pub mod csv_export;
pub mod database;
pub mod json_file;
pub mod model_artifacts;
pub mod repositories;

pub use csv_export::CsvExporter;
pub use database::Database;
pub use json_file::{JsonFileMarketDataRepository, JsonFilePredictionRepository};
pub use repositories::{SqliteMarketDataRepository, SqlitePredictionRepository};
