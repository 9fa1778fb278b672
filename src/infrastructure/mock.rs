//! Deterministic collaborators for tests and offline runs.

use crate::application::ml::predictor::{LoadedModel, ModelLoader, PricePredictor};
use crate::domain::errors::{IngestionError, PredictionError};
use crate::domain::market::{AggTrade, RawKline, Ticker24h};
use crate::domain::ml::feature_registry::FEATURE_NAMES;
use crate::domain::ml::prediction::FeatureWindow;
use crate::domain::ml::scaler::MinMaxScaler;
use crate::domain::ports::{KlineRequest, MarketDataSource};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Generates `count` well-formed klines spaced `interval_ms` apart.
///
/// Prices zigzag around a slow drift so that gains and losses both occur in
/// every indicator window.
pub fn synthetic_klines(start_ms: i64, interval_ms: i64, count: usize) -> Vec<RawKline> {
    (0..count)
        .map(|i| {
            let base = 100.0 + (i % 7) as f64 * 1.25 + i as f64 * 0.05;
            let close = if i % 2 == 0 { base + 0.9 } else { base - 0.7 };
            RawKline::from_ohlcv(
                start_ms + i as i64 * interval_ms,
                &format!("{:.2}", base),
                &format!("{:.2}", base.max(close) + 1.5),
                &format!("{:.2}", base.min(close) - 1.5),
                &format!("{:.2}", close),
                &format!("{:.3}", 20.0 + (i % 5) as f64),
            )
        })
        .collect()
}

/// In-memory market data source.
///
/// Every kline request returns all rows registered for the symbol, whatever
/// the requested range; requests are recorded for inspection.
#[derive(Clone, Default)]
pub struct MockMarketDataSource {
    klines: HashMap<String, Vec<RawKline>>,
    failing: HashSet<String>,
    requests: Arc<Mutex<Vec<KlineRequest>>>,
}

impl MockMarketDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_klines(mut self, symbol: &str, rows: Vec<RawKline>) -> Self {
        self.klines.insert(symbol.to_string(), rows);
        self
    }

    /// Requests for `symbol` fail with a transport error
    pub fn with_failure(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    pub fn requests(&self) -> Vec<KlineRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn check_available(&self, symbol: &str) -> Result<(), IngestionError> {
        if self.failing.contains(symbol) {
            return Err(IngestionError::Transport {
                endpoint: "mock".to_string(),
                reason: format!("{} is unavailable", symbol),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MarketDataSource for MockMarketDataSource {
    async fn fetch_klines(&self, request: &KlineRequest) -> Result<Vec<RawKline>, IngestionError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.check_available(&request.symbol)?;
        let rows = self.klines.get(&request.symbol).cloned().unwrap_or_default();
        info!("MockMarketDataSource: {} klines for {}", rows.len(), request.symbol);
        Ok(rows)
    }

    async fn fetch_ticker_24h(&self, symbol: &str) -> Result<Ticker24h, IngestionError> {
        self.check_available(symbol)?;
        let rows = self.klines.get(symbol).map(Vec::as_slice).unwrap_or_default();
        let price = |text: &str| Decimal::from_str(text).unwrap_or_default();
        let open = rows.first().map(|k| price(&k.open)).unwrap_or_default();
        let last = rows.last().map(|k| price(&k.close)).unwrap_or_default();
        let high = rows.iter().map(|k| price(&k.high)).max().unwrap_or_default();
        let low = rows.iter().map(|k| price(&k.low)).min().unwrap_or_default();
        let volume: Decimal = rows.iter().map(|k| price(&k.volume)).sum();
        let change = last - open;

        Ok(Ticker24h {
            symbol: symbol.to_string(),
            price_change: change,
            price_change_percent: if open.is_zero() {
                Decimal::ZERO
            } else {
                (change / open * Decimal::ONE_HUNDRED).round_dp(3)
            },
            weighted_avg_price: if rows.is_empty() {
                Decimal::ZERO
            } else {
                (rows.iter().map(|k| price(&k.close)).sum::<Decimal>() / Decimal::from(rows.len()))
                    .round_dp(8)
            },
            open_price: open,
            high_price: high,
            low_price: low,
            last_price: last,
            volume,
            quote_volume: Decimal::ZERO,
            open_time: rows.first().map_or(0, |k| k.open_time),
            close_time: rows.last().map_or(0, |k| k.close_time),
            first_id: 0,
            last_id: 0,
            count: rows.len() as u64,
        })
    }

    async fn fetch_agg_trades(
        &self,
        symbol: &str,
        limit: u32,
    ) -> Result<Vec<AggTrade>, IngestionError> {
        self.check_available(symbol)?;
        let rows = self.klines.get(symbol).map(Vec::as_slice).unwrap_or_default();
        let skip = rows.len().saturating_sub(limit as usize);
        Ok(rows
            .iter()
            .skip(skip)
            .enumerate()
            .map(|(i, k)| AggTrade {
                agg_trade_id: i as i64,
                price: Decimal::from_str(&k.close).unwrap_or_default(),
                quantity: Decimal::from_str(&k.volume).unwrap_or_default(),
                first_trade_id: i as i64,
                last_trade_id: i as i64,
                timestamp: k.open_time,
                is_buyer_maker: i % 2 == 0,
                is_best_match: true,
            })
            .collect())
    }
}

/// Predictor returning a fixed scaled output per horizon step
pub struct MockPredictor {
    outputs: Vec<f64>,
    sequence_length: usize,
    calls: Mutex<usize>,
}

impl MockPredictor {
    pub fn new(sequence_length: usize, outputs: Vec<f64>) -> Self {
        Self {
            outputs,
            sequence_length,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or_default()
    }
}

impl PricePredictor for MockPredictor {
    fn predict(&self, window: &FeatureWindow) -> Result<Vec<f64>, PredictionError> {
        if window.sequence_length != self.sequence_length {
            return Err(PredictionError::ShapeMismatch {
                expected: self.sequence_length,
                actual: window.sequence_length,
            });
        }
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }
        Ok(self.outputs.clone())
    }

    fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    fn name(&self) -> &str {
        "Mock"
    }
}

/// Serves one shared predictor for a fixed set of symbols
pub struct MockModelLoader {
    predictor: Arc<MockPredictor>,
    symbols: HashSet<String>,
    target_scaler: MinMaxScaler,
}

impl MockModelLoader {
    /// Identity feature scaling; target values map from `[target_min, target_max]`
    pub fn new(
        predictor: Arc<MockPredictor>,
        symbols: &[&str],
        target_min: f64,
        target_max: f64,
    ) -> Self {
        Self {
            predictor,
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            target_scaler: MinMaxScaler::new(vec![target_min], vec![target_max]),
        }
    }
}

impl ModelLoader for MockModelLoader {
    fn load(&self, symbol: &str) -> Result<LoadedModel, PredictionError> {
        if !self.symbols.contains(symbol) {
            return Err(PredictionError::ModelNotFound {
                path: format!("{}_best_model.onnx", symbol),
            });
        }
        Ok(LoadedModel {
            predictor: self.predictor.clone(),
            feature_scaler: MinMaxScaler::new(
                vec![0.0; FEATURE_NAMES.len()],
                vec![1.0; FEATURE_NAMES.len()],
            ),
            target_scaler: self.target_scaler.clone(),
        })
    }
}
