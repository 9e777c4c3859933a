use thiserror::Error;

/// Errors raised by the analytics core.
///
/// Only fitting (and label-based evaluation) can fail. Inference calls degrade
/// to fallback values instead of returning errors.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Training corpus is empty")]
    EmptyCorpus,

    #[error("Malformed telemetry record at index {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    #[error("Dimension mismatch: expected {expected} columns, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Model error: {0}")]
    Model(String),

    #[error("No labelled records available for evaluation")]
    MissingLabels,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<validator::ValidationErrors> for AnalyticsError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AnalyticsError::InvalidConfig(errors.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
