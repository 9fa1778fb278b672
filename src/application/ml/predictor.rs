use crate::domain::errors::PredictionError;
use crate::domain::ml::prediction::FeatureWindow;
use crate::domain::ml::scaler::MinMaxScaler;
use std::sync::Arc;

/// Interface for the trained sequence model
pub trait PricePredictor: Send + Sync {
    /// Map a scaled feature window to scaled forecasts, one per horizon step
    fn predict(&self, window: &FeatureWindow) -> Result<Vec<f64>, PredictionError>;

    /// Number of rows the model expects in a window
    fn sequence_length(&self) -> usize;

    /// Get model name/type
    fn name(&self) -> &str;
}

/// A predictor together with the scalers it was trained with
#[derive(Clone)]
pub struct LoadedModel {
    pub predictor: Arc<dyn PricePredictor>,
    pub feature_scaler: MinMaxScaler,
    pub target_scaler: MinMaxScaler,
}

/// Resolves the model artifacts of a symbol
pub trait ModelLoader: Send + Sync {
    fn load(&self, symbol: &str) -> Result<LoadedModel, PredictionError>;
}
