#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hanover/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod error;
pub mod labels;

// Re-export main types from sub-crates
pub use hanover_data as data;
pub use hanover_factors as factors;
pub use hanover_output as output;
pub use hanover_panel as panel;
pub use hanover_sorts as sorts;

pub use config::LibraryConfig;
pub use engine::FactorLibrary;
pub use error::{HanoverError, Result};

// Re-export the vocabulary types callers configure the engine with
pub use hanover_data::Frequency;
pub use hanover_data::warehouse::DateRange;
pub use hanover_factors::FactorName;
pub use hanover_panel::Characteristic;
pub use hanover_sorts::Weighting;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
