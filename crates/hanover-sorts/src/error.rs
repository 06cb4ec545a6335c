//! Error types for sorting and aggregation.

use thiserror::Error;

/// Result type for sort operations.
pub type Result<T> = std::result::Result<T, SortError>;

/// Errors that can occur while building sorted portfolios.
#[derive(Debug, Error)]
pub enum SortError {
    /// Percentile grid is empty, out of range, or not increasing
    #[error("Invalid percentile grid: {0}")]
    InvalidPercentiles(String),

    /// Sorting dimension is not supported
    #[error("Invalid sorting dimension: {0} (need at least 2 buckets)")]
    InvalidDimension(usize),

    /// A required column is missing from the panel
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}
