use thiserror::Error;

/// Errors raised while pulling data from the exchange
#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("Request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    HttpStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode {endpoint} response: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("Kline row has {actual} fields, expected {expected}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("Malformed {column} value: {value}")]
    MalformedField { column: &'static str, value: String },
}

impl IngestionError {
    /// Transport and HTTP failures may succeed on a later run; schema problems will not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            IngestionError::Transport { .. } | IngestionError::HttpStatus { .. }
        )
    }
}

/// Per-symbol pipeline failure. Never aborts the other symbols of a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Fetch failed for {symbol}: {source}")]
    Fetch {
        symbol: String,
        #[source]
        source: IngestionError,
    },

    #[error("Storage failed for {symbol}: {reason}")]
    Storage { symbol: String, reason: String },

    #[error("Fetch window for {symbol} is out of range: {reason}")]
    Window { symbol: String, reason: String },
}

impl PipelineError {
    pub fn symbol(&self) -> &str {
        match self {
            PipelineError::Fetch { symbol, .. }
            | PipelineError::Storage { symbol, .. }
            | PipelineError::Window { symbol, .. } => symbol,
        }
    }
}

/// Errors related to model inference
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Model artifact not found: {path}")]
    ModelNotFound { path: String },

    #[error("Failed to load model artifact {path}: {reason}")]
    ArtifactLoad { path: String, reason: String },

    #[error("Not enough history for {symbol}: need {required} rows, have {available}")]
    InsufficientHistory {
        symbol: String,
        required: usize,
        available: usize,
    },

    #[error("Forecast step of {hours}h is out of range")]
    InvalidInterval { hours: i64 },

    #[error("Model input shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Inference failed: {reason}")]
    Inference { reason: String },

    #[error("Storage failed: {reason}")]
    Storage { reason: String },
}
