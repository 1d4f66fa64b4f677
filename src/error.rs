//! Error types for the Kolosal feature-engineering search

use thiserror::Error;

/// Result type alias for Kolosal operations
pub type Result<T> = std::result::Result<T, KolosalError>;

/// Main error type for the feature-engineering engine
///
/// Variants split into two classes. Recoverable errors come from a single
/// transformation or evaluation and only cost the search that one candidate.
/// Everything else is fatal and aborts the run. See [`KolosalError::is_recoverable`].
#[derive(Error, Debug)]
pub enum KolosalError {
    #[error("Value error: {0}")]
    ValueError(String),

    #[error("Out of range: {0}")]
    RangeError(String),

    #[error("Memory allocation error: {0}")]
    MemoryError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Index error: {0}")]
    IndexError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Catalog error: {0}")]
    CatalogError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    #[error("Graph error: {0}")]
    GraphError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Model not fitted")]
    ModelNotFitted,
}

impl KolosalError {
    /// Whether a failure is local to one candidate representation.
    ///
    /// Value, range, memory, runtime and indexing failures raised while
    /// transforming or scoring a candidate are recoverable: the candidate is
    /// dropped and the search moves on. Catalog, configuration and any
    /// unclassified evaluator failure are fatal.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            KolosalError::ValueError(_)
                | KolosalError::RangeError(_)
                | KolosalError::MemoryError(_)
                | KolosalError::ComputationError(_)
                | KolosalError::IndexError(_)
                | KolosalError::ShapeError { .. }
                | KolosalError::ValidationError(_)
        )
    }
}

impl From<polars::error::PolarsError> for KolosalError {
    fn from(err: polars::error::PolarsError) -> Self {
        KolosalError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for KolosalError {
    fn from(err: serde_json::Error) -> Self {
        KolosalError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for KolosalError {
    fn from(err: ndarray::ShapeError) -> Self {
        KolosalError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
