// Synchronous processing core (normalizer, indicators, patterns)
pub mod processing;

// Model contract and ONNX inference
pub mod ml;

// Services
pub mod analysis;
pub mod pipeline;
pub mod prediction_service;
pub mod scheduler;

// Wiring and system orchestrator
pub mod bootstrap;
pub mod system;
