//! Error types for the tender threshold pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ThresholdError>;

/// Main error type for the pipeline
///
/// Missing values, unseen categories and absent optional columns are never
/// reported through this type; they are resolved by the sentinel and default
/// policies of the preprocessor. Only structural failures surface here.
#[derive(Error, Debug)]
pub enum ThresholdError {
    /// Too few usable rows, or the target is missing entirely
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// The trained column layout could not be reconstructed
    #[error("Preprocessing error: {0}")]
    Preprocessing(String),

    /// No complete artifact bundle is available
    #[error("Model not trained: no valid artifact bundle found")]
    ModelNotTrained,

    /// The model rejected the aligned feature row
    #[error("Prediction error: {message} (features: {})", format_features(.features))]
    Prediction {
        message: String,
        features: Vec<(String, f64)>,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_features(features: &[(String, f64)]) -> String {
    features
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<polars::error::PolarsError> for ThresholdError {
    fn from(err: polars::error::PolarsError) -> Self {
        ThresholdError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for ThresholdError {
    fn from(err: serde_json::Error) -> Self {
        ThresholdError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for ThresholdError {
    fn from(err: bincode::Error) -> Self {
        ThresholdError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for ThresholdError {
    fn from(err: ndarray::ShapeError) -> Self {
        ThresholdError::Shape {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
