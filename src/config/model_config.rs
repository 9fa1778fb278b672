//! Prediction model configuration parsing from environment variables.

use super::{Lookup, MAX_PERIOD_HOURS, ensure_range, parse_or, string_or};
use anyhow::{Result, bail};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ModelEnvConfig {
    /// Holds `{SYMBOL}_best_model.onnx`, `{SYMBOL}_scaler.json`, `{SYMBOL}_scaler_y.json`
    pub model_dir: PathBuf,
    pub sequence_length: usize,
    /// Spacing of forecast timestamps
    pub prediction_interval_hours: i64,
}

impl ModelEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let config = Self {
            model_dir: PathBuf::from(string_or(lookup, "MODEL_DIR", "models")),
            sequence_length: parse_or(lookup, "MODEL_SEQUENCE_LENGTH", 60)?,
            prediction_interval_hours: parse_or(lookup, "PREDICTION_INTERVAL_HOURS", 4)?,
        };
        if config.sequence_length == 0 {
            bail!("MODEL_SEQUENCE_LENGTH must be at least 1");
        }
        ensure_range(
            "PREDICTION_INTERVAL_HOURS",
            config.prediction_interval_hours,
            1,
            MAX_PERIOD_HOURS,
        )?;
        Ok(config)
    }
}
