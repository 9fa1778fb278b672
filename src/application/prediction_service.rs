use crate::application::ml::predictor::ModelLoader;
use crate::application::processing::round_f64;
use crate::config::MAX_PERIOD_HOURS;
use crate::domain::errors::PredictionError;
use crate::domain::ml::feature_registry::features_to_vector;
use crate::domain::ml::prediction::{FeatureWindow, Prediction};
use crate::domain::repositories::{MarketDataRepository, PredictionRepository};
use crate::infrastructure::observability::Metrics;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of one prediction request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionOutcome {
    pub symbol: String,
    /// Every forecast produced by the model, ascending
    pub predictions: Vec<Prediction>,
    /// Forecasts whose timestamp was not stored before
    pub stored: usize,
}

/// Runs the trained model over the newest stored records of a symbol.
pub struct PredictionService {
    market_data: Arc<dyn MarketDataRepository>,
    predictions: Arc<dyn PredictionRepository>,
    loader: Arc<dyn ModelLoader>,
    metrics: Option<Metrics>,
}

impl PredictionService {
    pub fn new(
        market_data: Arc<dyn MarketDataRepository>,
        predictions: Arc<dyn PredictionRepository>,
        loader: Arc<dyn ModelLoader>,
    ) -> Self {
        Self {
            market_data,
            predictions,
            loader,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Forecast `i` is stamped `interval_hours * (i + 1)` after the newest
    /// record; the step must lie in `1..=MAX_PERIOD_HOURS`.
    pub async fn predict(
        &self,
        symbol: &str,
        interval_hours: i64,
    ) -> Result<PredictionOutcome, PredictionError> {
        if !(1..=MAX_PERIOD_HOURS).contains(&interval_hours) {
            return Err(PredictionError::InvalidInterval {
                hours: interval_hours,
            });
        }
        if let Some(metrics) = &self.metrics {
            metrics.inc_prediction_requests(symbol);
        }

        let model = self.loader.load(symbol)?;
        let sequence_length = model.predictor.sequence_length();

        let rows = self
            .market_data
            .find_latest(symbol, sequence_length)
            .await
            .map_err(|e| PredictionError::Storage {
                reason: format!("{:#}", e),
            })?;
        let Some(last) = rows.last() else {
            return Err(insufficient(symbol, sequence_length, 0));
        };
        if rows.len() < sequence_length {
            return Err(insufficient(symbol, sequence_length, rows.len()));
        }
        let last_open_time = last.open_time;

        let mut scaled = Vec::with_capacity(rows.len());
        for row in &rows {
            let features = features_to_vector(row);
            let transformed = model.feature_scaler.transform(&features).ok_or(
                PredictionError::ShapeMismatch {
                    expected: model.feature_scaler.n_features(),
                    actual: features.len(),
                },
            )?;
            scaled.push(transformed);
        }
        let window = FeatureWindow::from_rows(&scaled).ok_or_else(|| PredictionError::Inference {
            reason: "empty feature window".to_string(),
        })?;

        debug!(
            "{}: running {} over window {:?}",
            symbol,
            model.predictor.name(),
            window.shape()
        );
        let outputs = model.predictor.predict(&window)?;

        let mut predictions = Vec::with_capacity(outputs.len());
        for (step, scaled_value) in outputs.iter().enumerate() {
            let value = model
                .target_scaler
                .inverse_value(0, *scaled_value)
                .and_then(|v| round_f64(v, 2))
                .ok_or_else(|| PredictionError::Inference {
                    reason: format!("model output {} is not a finite price", scaled_value),
                })?;
            predictions.push(Prediction {
                symbol: symbol.to_string(),
                timestamp: forecast_time(last_open_time, interval_hours, step)?,
                prediction: value,
            });
        }

        let existing: HashSet<_> = self
            .predictions
            .find_by_symbol(symbol)
            .await
            .map_err(|e| PredictionError::Storage {
                reason: format!("{:#}", e),
            })?
            .into_iter()
            .map(|p| p.timestamp)
            .collect();
        let new: Vec<Prediction> = predictions
            .iter()
            .filter(|p| !existing.contains(&p.timestamp))
            .cloned()
            .collect();

        let stored = if new.is_empty() {
            0
        } else {
            self.predictions
                .save_new(&new)
                .await
                .map_err(|e| PredictionError::Storage {
                    reason: format!("{:#}", e),
                })?
        };

        info!(
            "{}: {} forecasts, {} new, {} already stored",
            symbol,
            predictions.len(),
            stored,
            predictions.len() - new.len()
        );

        Ok(PredictionOutcome {
            symbol: symbol.to_string(),
            predictions,
            stored,
        })
    }
}

fn forecast_time(
    last: DateTime<Utc>,
    interval_hours: i64,
    step: usize,
) -> Result<DateTime<Utc>, PredictionError> {
    i64::try_from(step + 1)
        .ok()
        .and_then(|n| interval_hours.checked_mul(n))
        .and_then(TimeDelta::try_hours)
        .and_then(|offset| last.checked_add_signed(offset))
        .ok_or(PredictionError::InvalidInterval {
            hours: interval_hours,
        })
}

fn insufficient(symbol: &str, required: usize, available: usize) -> PredictionError {
    PredictionError::InsufficientHistory {
        symbol: symbol.to_string(),
        required,
        available,
    }
}
