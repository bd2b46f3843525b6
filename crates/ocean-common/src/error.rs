//! Error types for the ocean-query engine.

use thiserror::Error;

/// Result type alias using OceanError.
pub type OceanResult<T> = Result<T, OceanError>;

/// Primary error type for extraction operations.
///
/// Only `InvalidCoordinate` (and `Config` at construction time) ever
/// crosses the service boundary; everything else is absorbed into the
/// per-dataset extraction status.
#[derive(Debug, Error)]
pub enum OceanError {
    /// Malformed latitude/longitude input. Never retried.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// No harmonized file exists for the requested (dataset, date).
    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    /// A harmonized file exists but failed structural validation.
    #[error("data corrupt: {0}")]
    DataCorrupt(String),

    /// A single dataset's extraction exceeded its budget.
    #[error("extraction timed out after {0} ms")]
    Timeout(u64),

    /// The requested dataset has no configured grid descriptor.
    #[error("unknown dataset: {0}")]
    UnknownDataset(String),

    /// Configuration error at engine construction.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OceanError {
    /// Create an InvalidCoordinate error.
    pub fn invalid_coordinate(msg: impl Into<String>) -> Self {
        Self::InvalidCoordinate(msg.into())
    }

    /// Create a DataUnavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::DataUnavailable(msg.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<serde_json::Error> for OceanError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {}", err))
    }
}
