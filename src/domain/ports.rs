use crate::domain::errors::IngestionError;
use crate::domain::market::{AggTrade, KlineInterval, RawKline, Ticker24h};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Parameters of a kline download for one symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KlineRequest {
    pub symbol: String,
    pub interval: KlineInterval,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Page size per exchange call
    pub limit: u32,
}

/// Exchange market data collaborator.
///
/// Implementations return raw exchange rows; coercion happens downstream.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// All klines opening within `[start, end]`, oldest first.
    async fn fetch_klines(&self, request: &KlineRequest) -> Result<Vec<RawKline>, IngestionError>;

    async fn fetch_ticker_24h(&self, symbol: &str) -> Result<Ticker24h, IngestionError>;

    async fn fetch_agg_trades(
        &self,
        symbol: &str,
        limit: u32,
    ) -> Result<Vec<AggTrade>, IngestionError>;
}
