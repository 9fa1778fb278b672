use serde::{Deserialize, Serialize};

/// Per-column min-max scaler fitted offline alongside the model.
///
/// A column whose min equals its max is divided by 1, so it maps to 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    pub data_min: Vec<f64>,
    pub data_max: Vec<f64>,
}

impl MinMaxScaler {
    pub fn new(data_min: Vec<f64>, data_max: Vec<f64>) -> Self {
        Self { data_min, data_max }
    }

    pub fn n_features(&self) -> usize {
        self.data_min.len()
    }

    fn range(&self, col: usize) -> f64 {
        let r = self.data_max[col] - self.data_min[col];
        if r == 0.0 { 1.0 } else { r }
    }

    /// Scales one row; returns `None` on a width mismatch.
    pub fn transform(&self, row: &[f64]) -> Option<Vec<f64>> {
        if row.len() != self.n_features() || self.data_max.len() != self.n_features() {
            return None;
        }
        Some(
            row.iter()
                .enumerate()
                .map(|(i, x)| (x - self.data_min[i]) / self.range(i))
                .collect(),
        )
    }

    /// Maps a scaled value of column `col` back to its original unit.
    pub fn inverse_value(&self, col: usize, scaled: f64) -> Option<f64> {
        if col >= self.n_features() || col >= self.data_max.len() {
            return None;
        }
        Some(scaled * self.range(col) + self.data_min[col])
    }
}
