//! Error type of the engine.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, HanoverError>;

/// Errors that can occur while running the pipeline.
#[derive(Debug, Error)]
pub enum HanoverError {
    /// Data-layer error
    #[error(transparent)]
    Data(#[from] hanover_data::DataError),

    /// Panel-preparation error
    #[error(transparent)]
    Panel(#[from] hanover_panel::PanelError),

    /// Sorting error
    #[error(transparent)]
    Sort(#[from] hanover_sorts::SortError),

    /// Factor-assembly error
    #[error(transparent)]
    Factor(#[from] hanover_factors::FactorError),

    /// Statistics error
    #[error(transparent)]
    Stats(#[from] hanover_output::StatsError),

    /// Comparison error
    #[error(transparent)]
    Compare(#[from] hanover_output::CompareError),

    /// Invalid engine configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Sorting dimensions do not match the configured characteristics
    #[error("Sorting dimensions {dims:?} do not match {characteristics} characteristics")]
    DimensionMismatch {
        /// Requested bucket counts
        dims: Vec<usize>,
        /// Number of configured sort characteristics
        characteristics: usize,
    },

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}
