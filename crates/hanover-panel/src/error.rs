//! Error types for panel preparation.

use thiserror::Error;

/// Result type for panel operations.
pub type Result<T> = std::result::Result<T, PanelError>;

/// Errors that can occur while preparing panels.
#[derive(Debug, Error)]
pub enum PanelError {
    /// A required column is missing from an input frame
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// Characteristic label is not recognized
    #[error("Unknown characteristic: {0}")]
    UnknownCharacteristic(String),

    /// A prior-return window is not a supported strategy
    #[error("Unsupported prior-return window: ({j}-{k}) at frequency {frequency}")]
    UnsupportedPriorWindow {
        /// First lagged period of the window
        j: u32,
        /// Last lagged period of the window
        k: u32,
        /// Frequency the window was requested at
        frequency: String,
    },

    /// Frequency is not valid for this operation
    #[error("Invalid frequency for {operation}: {frequency}")]
    InvalidFrequency {
        /// Operation that rejected the frequency
        operation: String,
        /// The offending frequency
        frequency: String,
    },

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}
