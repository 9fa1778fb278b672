//! In-Memory Repository Implementations
//!
//! Thread-safe, in-memory implementations of the repository traits defined in
//! `domain::repositories`, used by tests and dry runs.
//!
//! Data is lost on application restart.

use crate::domain::market::ProcessedCandle;
use crate::domain::ml::prediction::Prediction;
use crate::domain::repositories::{MarketDataRepository, PredictionRepository};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type SeriesMap<T> = BTreeMap<String, BTreeMap<DateTime<Utc>, T>>;

/// In-memory implementation of MarketDataRepository
#[derive(Clone)]
pub struct InMemoryMarketDataRepository {
    records: Arc<RwLock<SeriesMap<ProcessedCandle>>>,
}

impl InMemoryMarketDataRepository {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    pub async fn count(&self, symbol: &str) -> usize {
        self.records
            .read()
            .await
            .get(symbol)
            .map_or(0, |series| series.len())
    }
}

impl Default for InMemoryMarketDataRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataRepository for InMemoryMarketDataRepository {
    async fn save_batch(&self, records: &[ProcessedCandle]) -> Result<usize> {
        let mut store = self.records.write().await;
        for record in records {
            store
                .entry(record.symbol.clone())
                .or_default()
                .insert(record.open_time, record.clone());
        }
        Ok(records.len())
    }

    async fn latest_open_time(&self, symbol: &str) -> Result<Option<DateTime<Utc>>> {
        let store = self.records.read().await;
        Ok(store
            .get(symbol)
            .and_then(|series| series.keys().next_back().copied()))
    }

    async fn find_range(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProcessedCandle>> {
        if start > end {
            return Ok(Vec::new());
        }
        let store = self.records.read().await;
        Ok(store
            .get(symbol)
            .map(|series| series.range(start..=end).map(|(_, r)| r.clone()).collect())
            .unwrap_or_default())
    }

    async fn find_latest(&self, symbol: &str, limit: usize) -> Result<Vec<ProcessedCandle>> {
        let store = self.records.read().await;
        let mut latest: Vec<ProcessedCandle> = store
            .get(symbol)
            .map(|series| series.values().rev().take(limit).cloned().collect())
            .unwrap_or_default();
        latest.reverse();
        Ok(latest)
    }

    async fn symbols(&self) -> Result<Vec<String>> {
        let store = self.records.read().await;
        Ok(store
            .iter()
            .filter(|(_, series)| !series.is_empty())
            .map(|(symbol, _)| symbol.clone())
            .collect())
    }

    async fn prune(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut store = self.records.write().await;
        let mut removed = 0;
        for series in store.values_mut() {
            let before = series.len();
            series.retain(|open_time, _| *open_time >= cutoff);
            removed += before - series.len();
        }
        Ok(removed)
    }
}

/// In-memory implementation of PredictionRepository
#[derive(Clone)]
pub struct InMemoryPredictionRepository {
    predictions: Arc<RwLock<SeriesMap<Prediction>>>,
}

impl InMemoryPredictionRepository {
    pub fn new() -> Self {
        Self {
            predictions: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }
}

impl Default for InMemoryPredictionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PredictionRepository for InMemoryPredictionRepository {
    async fn find_by_symbol(&self, symbol: &str) -> Result<Vec<Prediction>> {
        let store = self.predictions.read().await;
        Ok(store
            .get(symbol)
            .map(|series| series.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn save_new(&self, predictions: &[Prediction]) -> Result<usize> {
        let mut store = self.predictions.write().await;
        let mut inserted = 0;
        for p in predictions {
            let series = store.entry(p.symbol.clone()).or_default();
            if !series.contains_key(&p.timestamp) {
                series.insert(p.timestamp, p.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::IndicatorSet;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn record(hour: i64) -> ProcessedCandle {
        ProcessedCandle {
            symbol: "BTCUSDT".to_string(),
            open_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hour),
            open: dec!(100),
            high: dec!(101),
            low: dec!(99),
            close: dec!(100.5),
            volume: dec!(3),
            trend: 1,
            volume_price_ratio: dec!(0.0299),
            indicator: IndicatorSet {
                bb_ma: dec!(100),
                bb_upper: dec!(101),
                bb_lower: dec!(99),
                rsi: dec!(50),
                doji: 0,
                hammer: 0,
                shooting_star: 0,
            },
        }
    }

    #[tokio::test]
    async fn test_upsert_and_queries() {
        let repo = InMemoryMarketDataRepository::new();
        repo.save_batch(&[record(2), record(0), record(1)]).await.unwrap();
        repo.save_batch(&[record(1)]).await.unwrap();

        assert_eq!(repo.count("BTCUSDT").await, 3);
        assert_eq!(
            repo.latest_open_time("BTCUSDT").await.unwrap(),
            Some(record(2).open_time)
        );

        let latest = repo.find_latest("BTCUSDT", 2).await.unwrap();
        assert_eq!(latest[0].open_time, record(1).open_time);
        assert_eq!(latest[1].open_time, record(2).open_time);

        let range = repo
            .find_range("BTCUSDT", record(0).open_time, record(1).open_time)
            .await
            .unwrap();
        assert_eq!(range.len(), 2);
    }

    #[tokio::test]
    async fn test_prune_removes_old_records() {
        let repo = InMemoryMarketDataRepository::new();
        repo.save_batch(&[record(0), record(1), record(2)]).await.unwrap();
        assert_eq!(repo.prune(record(2).open_time).await.unwrap(), 2);
        assert_eq!(repo.symbols().await.unwrap(), vec!["BTCUSDT".to_string()]);
    }

    #[tokio::test]
    async fn test_prediction_keys_are_unique() {
        let repo = InMemoryPredictionRepository::new();
        let p = Prediction {
            symbol: "BTCUSDT".to_string(),
            timestamp: record(4).open_time,
            prediction: dec!(101.25),
        };
        assert_eq!(repo.save_new(&[p.clone(), p.clone()]).await.unwrap(), 1);
        assert_eq!(repo.find_by_symbol("BTCUSDT").await.unwrap().len(), 1);
    }
}
