//! Error types for factor assembly.

use thiserror::Error;

/// Result type for factor operations.
pub type Result<T> = std::result::Result<T, FactorError>;

/// Errors that can occur while assembling factors.
#[derive(Debug, Error)]
pub enum FactorError {
    /// Factor label is not recognized
    #[error("Unknown factor: {0}")]
    UnknownFactor(String),

    /// Factor cannot be built at the requested frequency
    #[error("{factor} is not available at frequency {frequency}")]
    UnsupportedFrequency {
        /// Factor label
        factor: String,
        /// Requested frequency
        frequency: String,
    },

    /// A required input frame or column is missing
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Sorting error from the sort engine
    #[error(transparent)]
    Sort(#[from] hanover_sorts::SortError),

    /// Panel error from panel preparation
    #[error(transparent)]
    Panel(#[from] hanover_panel::PanelError),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}
