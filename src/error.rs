//! Error types for the pricecast library.

use thiserror::Error;

/// Result type alias for forecast operations.
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Failure reported by a price source.
///
/// A missing symbol is a fast user-facing error, a transient failure may be
/// retried by the caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// The provider has no data for the requested symbol or range.
    #[error("no data for symbol '{0}'")]
    NotFound(String),

    /// The fetch failed for a reason unrelated to the data itself.
    #[error("transient fetch error: {0}")]
    Transient(String),
}

/// Errors that can occur during forecasting and calibration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Timestamp-related error.
    #[error("timestamp error: {0}")]
    TimestampError(String),

    /// Model has not been fitted yet.
    #[error("model must be fitted before prediction")]
    FitRequired,

    /// No usable (finite) value in the data.
    #[error("missing values detected in data")]
    MissingValues,

    /// Index out of bounds.
    #[error("index out of bounds: {index} (size: {size})")]
    IndexOutOfBounds { index: usize, size: usize },

    /// Numerical fitting did not converge or produced degenerate output.
    #[error("fit failed: {0}")]
    FitFailed(String),

    /// Predictions match actuals too closely to be trusted.
    #[error("potential data leakage: {match_ratio:.2} of predictions match actuals")]
    DataLeakage { match_ratio: f64 },

    /// Prediction corpus could not be read or parsed.
    #[error("corpus error: {0}")]
    Corpus(String),

    /// Configuration could not be read or is out of range.
    #[error("config error: {0}")]
    Config(String),

    /// The price source failed.
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl ForecastError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ForecastError::Source(SourceError::Transient(_)))
    }
}
