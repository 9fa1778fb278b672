pub mod onnx_predictor;
pub mod predictor;

pub use onnx_predictor::{OnnxModelLoader, OnnxPredictor};
pub use predictor::{LoadedModel, ModelLoader, PricePredictor};
