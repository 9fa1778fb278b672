//! File-backed repositories: one JSON document per symbol.
//!
//! Market data lives in `{SYMBOL}_final.json` as `{ "symbol", "last_updated",
//! "data": [...] }`; forecasts in `{SYMBOL}_predictions.json`.

use crate::domain::market::ProcessedCandle;
use crate::domain::ml::prediction::Prediction;
use crate::domain::repositories::{MarketDataRepository, PredictionRepository};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

const MARKET_SUFFIX: &str = "_final.json";
const PREDICTION_SUFFIX: &str = "_predictions.json";

#[derive(Debug, Serialize, Deserialize)]
struct SymbolDocument<T> {
    symbol: String,
    last_updated: Option<DateTime<Utc>>,
    data: Vec<T>,
}

async fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<SymbolDocument<T>>> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let doc = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(doc))
}

/// Writes through a temporary file so readers never see a partial document.
async fn write_document<T: Serialize>(path: &Path, doc: &SymbolDocument<T>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .context("Failed to create data directory")?;
    }
    let json = serde_json::to_string_pretty(doc)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

pub struct JsonFileMarketDataRepository {
    dir: PathBuf,
    // Serializes read-merge-write cycles
    lock: Mutex<()>,
}

impl JsonFileMarketDataRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}{}", symbol, MARKET_SUFFIX))
    }

    async fn load(&self, symbol: &str) -> Result<Vec<ProcessedCandle>> {
        Ok(read_document(&self.path_for(symbol))
            .await?
            .map(|doc| doc.data)
            .unwrap_or_default())
    }

    async fn store(&self, symbol: &str, data: Vec<ProcessedCandle>) -> Result<()> {
        let doc = SymbolDocument {
            symbol: symbol.to_string(),
            last_updated: Some(Utc::now()),
            data,
        };
        write_document(&self.path_for(symbol), &doc).await
    }
}

#[async_trait]
impl MarketDataRepository for JsonFileMarketDataRepository {
    async fn save_batch(&self, records: &[ProcessedCandle]) -> Result<usize> {
        let _guard = self.lock.lock().await;

        let mut by_symbol: BTreeMap<&str, Vec<&ProcessedCandle>> = BTreeMap::new();
        for record in records {
            by_symbol.entry(&record.symbol).or_default().push(record);
        }

        for (symbol, incoming) in by_symbol {
            let mut merged: BTreeMap<DateTime<Utc>, ProcessedCandle> = self
                .load(symbol)
                .await?
                .into_iter()
                .map(|r| (r.open_time, r))
                .collect();
            for record in incoming {
                merged.insert(record.open_time, record.clone());
            }
            let count = merged.len();
            self.store(symbol, merged.into_values().collect()).await?;
            debug!("{}: {} records in {}", symbol, count, MARKET_SUFFIX);
        }

        Ok(records.len())
    }

    async fn latest_open_time(&self, symbol: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.load(symbol).await?.iter().map(|r| r.open_time).max())
    }

    async fn find_range(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<ProcessedCandle>> {
        Ok(self
            .load(symbol)
            .await?
            .into_iter()
            .filter(|r| r.open_time >= start && r.open_time <= end)
            .collect())
    }

    async fn find_latest(&self, symbol: &str, limit: usize) -> Result<Vec<ProcessedCandle>> {
        let data = self.load(symbol).await?;
        let skip = data.len().saturating_sub(limit);
        Ok(data.into_iter().skip(skip).collect())
    }

    async fn symbols(&self) -> Result<Vec<String>> {
        let mut symbols = Vec::new();
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(symbols),
            Err(e) => return Err(e).context("Failed to list data directory"),
        };
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str()
                && let Some(symbol) = name.strip_suffix(MARKET_SUFFIX)
            {
                symbols.push(symbol.to_string());
            }
        }
        symbols.sort();
        Ok(symbols)
    }

    async fn prune(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let mut removed = 0;
        for symbol in self.symbols().await? {
            let data = self.load(&symbol).await?;
            let before = data.len();
            let kept: Vec<ProcessedCandle> =
                data.into_iter().filter(|r| r.open_time >= cutoff).collect();
            if kept.len() != before {
                removed += before - kept.len();
                self.store(&symbol, kept).await?;
            }
        }
        Ok(removed)
    }
}

pub struct JsonFilePredictionRepository {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl JsonFilePredictionRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}{}", symbol, PREDICTION_SUFFIX))
    }
}

#[async_trait]
impl PredictionRepository for JsonFilePredictionRepository {
    async fn find_by_symbol(&self, symbol: &str) -> Result<Vec<Prediction>> {
        Ok(read_document(&self.path_for(symbol))
            .await?
            .map(|doc| doc.data)
            .unwrap_or_default())
    }

    async fn save_new(&self, predictions: &[Prediction]) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let mut inserted = 0;

        let mut by_symbol: BTreeMap<&str, Vec<&Prediction>> = BTreeMap::new();
        for p in predictions {
            by_symbol.entry(&p.symbol).or_default().push(p);
        }

        for (symbol, incoming) in by_symbol {
            let mut stored: BTreeMap<DateTime<Utc>, Prediction> = self
                .find_by_symbol(symbol)
                .await?
                .into_iter()
                .map(|p| (p.timestamp, p))
                .collect();
            for p in incoming {
                if !stored.contains_key(&p.timestamp) {
                    stored.insert(p.timestamp, p.clone());
                    inserted += 1;
                }
            }
            let doc = SymbolDocument {
                symbol: symbol.to_string(),
                last_updated: Some(Utc::now()),
                data: stored.into_values().collect::<Vec<_>>(),
            };
            write_document(&self.path_for(symbol), &doc).await?;
        }

        Ok(inserted)
    }
}
