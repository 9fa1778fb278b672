use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A stored price forecast, keyed by (symbol, timestamp)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub prediction: Decimal,
}

/// Scaled model input: `sequence_length` rows of `feature_count` values,
/// flattened row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureWindow {
    pub sequence_length: usize,
    pub feature_count: usize,
    pub values: Vec<f32>,
}

impl FeatureWindow {
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let feature_count = rows.first()?.len();
        if rows.iter().any(|r| r.len() != feature_count) {
            return None;
        }
        Some(Self {
            sequence_length: rows.len(),
            feature_count,
            values: rows.iter().flatten().map(|v| *v as f32).collect(),
        })
    }

    /// Tensor shape `[batch, sequence, features]`
    pub fn shape(&self) -> [usize; 3] {
        [1, self.sequence_length, self.feature_count]
    }
}
