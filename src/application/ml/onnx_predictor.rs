use super::predictor::{LoadedModel, ModelLoader, PricePredictor};
use crate::domain::errors::PredictionError;
use crate::domain::ml::feature_registry::FEATURE_NAMES;
use crate::domain::ml::prediction::FeatureWindow;
use crate::infrastructure::persistence::model_artifacts::ModelArtifacts;
use ort::session::Session;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

pub struct OnnxPredictor {
    session: Mutex<Session>,
    model_path: PathBuf,
    sequence_length: usize,
}

impl OnnxPredictor {
    pub fn load(model_path: &Path, sequence_length: usize) -> Result<Self, PredictionError> {
        if !model_path.exists() {
            return Err(PredictionError::ModelNotFound {
                path: model_path.display().to_string(),
            });
        }

        let session = Session::builder()
            .map_err(|e| load_error(model_path, e))?
            .commit_from_file(model_path)
            .map_err(|e| load_error(model_path, e))?;

        info!("Successfully loaded ONNX model from {:?}", model_path);
        Ok(Self {
            session: Mutex::new(session),
            model_path: model_path.to_path_buf(),
            sequence_length,
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

fn load_error(path: &Path, e: impl std::fmt::Display) -> PredictionError {
    PredictionError::ArtifactLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

impl PricePredictor for OnnxPredictor {
    fn predict(&self, window: &FeatureWindow) -> Result<Vec<f64>, PredictionError> {
        if window.sequence_length != self.sequence_length {
            return Err(PredictionError::ShapeMismatch {
                expected: self.sequence_length,
                actual: window.sequence_length,
            });
        }
        if window.feature_count != FEATURE_NAMES.len() {
            return Err(PredictionError::ShapeMismatch {
                expected: FEATURE_NAMES.len(),
                actual: window.feature_count,
            });
        }

        let inference = |reason: String| PredictionError::Inference { reason };

        let mut session = self
            .session
            .lock()
            .map_err(|e| inference(format!("Mutex lock failed: {}", e)))?;

        // [batch, seq_len, features], single batch
        let shape = window.shape().to_vec();
        let input_value = ort::value::Value::from_array((shape.as_slice(), window.values.clone()))
            .map_err(|e| inference(format!("Input value creation failed: {}", e)))?;

        let inputs = ort::inputs![input_value];
        let outputs = session.run(inputs).map_err(|e| inference(e.to_string()))?;

        let output_value = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or_else(|| inference("No output found".to_string()))?;
        let data = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| inference(e.to_string()))?;

        let values: Vec<f64> = data.1.iter().map(|v| *v as f64).collect();
        if values.is_empty() {
            return Err(inference("Empty output".to_string()));
        }
        Ok(values)
    }

    fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    fn name(&self) -> &str {
        "ONNX Runtime (LSTM)"
    }
}

/// Loads `{SYMBOL}_best_model.onnx` and its scalers from the model directory
pub struct OnnxModelLoader {
    artifacts: ModelArtifacts,
    sequence_length: usize,
}

impl OnnxModelLoader {
    pub fn new(model_dir: impl Into<PathBuf>, sequence_length: usize) -> Self {
        Self {
            artifacts: ModelArtifacts::new(model_dir),
            sequence_length,
        }
    }
}

impl ModelLoader for OnnxModelLoader {
    fn load(&self, symbol: &str) -> Result<LoadedModel, PredictionError> {
        let predictor =
            OnnxPredictor::load(&self.artifacts.model_path(symbol), self.sequence_length)?;
        Ok(LoadedModel {
            predictor: Arc::new(predictor),
            feature_scaler: self.artifacts.load_feature_scaler(symbol)?,
            target_scaler: self.artifacts.load_target_scaler(symbol)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_file_is_reported() {
        match OnnxPredictor::load(Path::new("non_existent.onnx"), 60) {
            Err(PredictionError::ModelNotFound { path }) => {
                assert!(path.contains("non_existent.onnx"))
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("model should not load"),
        }
    }

    #[test]
    fn test_loader_reports_missing_symbol_model() {
        let loader = OnnxModelLoader::new("no_such_model_dir", 60);
        assert!(matches!(
            loader.load("BTCUSDT"),
            Err(PredictionError::ModelNotFound { .. })
        ));
    }
}
