//! Repository abstractions for persisted market records and forecasts.
//!
//! Implementations live in `infrastructure::persistence` (sqlite, JSON files)
//! and `infrastructure::repositories` (in-memory, for tests).

use crate::domain::market::ProcessedCandle;
use crate::domain::ml::prediction::Prediction;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Processed candles keyed by (symbol, open_time)
#[async_trait]
pub trait MarketDataRepository: Send + Sync {
    /// Upsert records; returns how many were written
    async fn save_batch(&self, records: &[ProcessedCandle]) -> Result<usize>;

    /// Open time of the newest stored record for `symbol`
    async fn latest_open_time(&self, symbol: &str) -> Result<Option<DateTime<Utc>>>;

    /// Records with `start <= open_time <= end`, ascending
    async fn find_range(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProcessedCandle>>;

    /// The newest `limit` records, returned ascending
    async fn find_latest(&self, symbol: &str, limit: usize) -> Result<Vec<ProcessedCandle>>;

    /// Every symbol with at least one record
    async fn symbols(&self) -> Result<Vec<String>>;

    /// Delete records older than `cutoff`; returns how many were removed
    async fn prune(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

/// Forecasts keyed by (symbol, timestamp)
#[async_trait]
pub trait PredictionRepository: Send + Sync {
    /// All forecasts for `symbol`, ascending by timestamp
    async fn find_by_symbol(&self, symbol: &str) -> Result<Vec<Prediction>>;

    /// Insert forecasts whose key is not stored yet; returns how many were new
    async fn save_new(&self, predictions: &[Prediction]) -> Result<usize>;
}
