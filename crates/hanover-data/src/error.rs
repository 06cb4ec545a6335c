//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur during data operations.
#[derive(Debug, Error)]
pub enum DataError {
    /// Warehouse rejected or failed a query
    #[error("Warehouse query error: {0}")]
    Warehouse(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Invalid date range
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date of the range
        start: String,
        /// End date of the range
        end: String,
    },

    /// Required environment variable is not set
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    /// Query result not present in the cache and refresh was not requested
    #[error("Cache miss for {key}; re-run with query execution enabled")]
    CacheMiss {
        /// Cache key of the missing result
        key: String,
    },

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown observation frequency
    #[error("Unknown frequency: {0} (expected one of D, W, M, Q, A)")]
    UnknownFrequency(String),

    /// Reference series file is malformed
    #[error("Reference series error: {0}")]
    Reference(String),
}
