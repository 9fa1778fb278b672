use crate::domain::errors::PredictionError;
use crate::domain::ml::scaler::MinMaxScaler;
use std::path::{Path, PathBuf};

/// Locates the per-symbol artifacts produced by offline training
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    dir: PathBuf,
}

impl ModelArtifacts {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn model_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}_best_model.onnx", symbol))
    }

    pub fn feature_scaler_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}_scaler.json", symbol))
    }

    pub fn target_scaler_path(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}_scaler_y.json", symbol))
    }

    pub fn load_feature_scaler(&self, symbol: &str) -> Result<MinMaxScaler, PredictionError> {
        load_scaler(&self.feature_scaler_path(symbol))
    }

    pub fn load_target_scaler(&self, symbol: &str) -> Result<MinMaxScaler, PredictionError> {
        load_scaler(&self.target_scaler_path(symbol))
    }
}

/// Reads a `{ "data_min": [...], "data_max": [...] }` document
pub fn load_scaler(path: &Path) -> Result<MinMaxScaler, PredictionError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PredictionError::ModelNotFound {
                path: path.display().to_string(),
            }
        } else {
            PredictionError::ArtifactLoad {
                path: path.display().to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    let scaler: MinMaxScaler =
        serde_json::from_str(&content).map_err(|e| PredictionError::ArtifactLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    if scaler.data_min.len() != scaler.data_max.len() || scaler.data_min.is_empty() {
        return Err(PredictionError::ArtifactLoad {
            path: path.display().to_string(),
            reason: format!(
                "data_min has {} columns, data_max has {}",
                scaler.data_min.len(),
                scaler.data_max.len()
            ),
        });
    }
    Ok(scaler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_paths() {
        let artifacts = ModelArtifacts::new("models");
        assert_eq!(
            artifacts.model_path("BTCUSDT"),
            PathBuf::from("models/BTCUSDT_best_model.onnx")
        );
        assert_eq!(
            artifacts.target_scaler_path("ETHUSDT"),
            PathBuf::from("models/ETHUSDT_scaler_y.json")
        );
    }

    #[test]
    fn test_load_scaler_from_json() {
        let dir = std::env::temp_dir().join(format!("cryptobot-scaler-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("BTCUSDT_scaler_y.json");
        std::fs::write(&path, r#"{"data_min":[100.0],"data_max":[200.0]}"#).unwrap();

        let scaler = load_scaler(&path).unwrap();
        assert_eq!(scaler.inverse_value(0, 0.5), Some(150.0));

        std::fs::write(&path, r#"{"data_min":[1.0,2.0],"data_max":[3.0]}"#).unwrap();
        assert!(matches!(
            load_scaler(&path),
            Err(PredictionError::ArtifactLoad { .. })
        ));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_scaler_is_not_found() {
        assert!(matches!(
            load_scaler(Path::new("missing/BTCUSDT_scaler.json")),
            Err(PredictionError::ModelNotFound { .. })
        ));
    }
}
