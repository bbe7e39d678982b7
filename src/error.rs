//! Error types for AstraGuard
//!
//! Every failure is fatal to the operation that raised it: nothing in the
//! simulation core retries or degrades.

use thiserror::Error;

/// Result type alias for AstraGuard operations
pub type Result<T> = std::result::Result<T, AstraError>;

/// Main error type for AstraGuard operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AstraError {
    /// A parameter is outside its accepted domain
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The anomaly detector was used before `fit`
    #[error("Anomaly detector is not fitted, call fit() first")]
    NotFitted,

    /// Telemetry is missing a required channel
    #[error("Dimension mismatch: telemetry is missing channel '{channel}'")]
    DimensionMismatch { channel: String },

    /// File system error while loading or saving
    #[error("I/O error: {0}")]
    Io(String),

    /// Malformed CSV or JSON input
    #[error("Format error at line {line}: {message}")]
    Format { line: usize, message: String },
}

impl AstraError {
    /// Shorthand for an [`AstraError::InvalidArgument`].
    pub fn invalid(message: impl Into<String>) -> Self {
        AstraError::InvalidArgument(message.into())
    }
}

impl From<std::io::Error> for AstraError {
    fn from(err: std::io::Error) -> Self {
        AstraError::Io(err.to_string())
    }
}

impl From<csv::Error> for AstraError {
    fn from(err: csv::Error) -> Self {
        let line = err
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or_default();
        AstraError::Format {
            line,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AstraError {
    fn from(err: serde_json::Error) -> Self {
        AstraError::Format {
            line: err.line(),
            message: err.to_string(),
        }
    }
}
