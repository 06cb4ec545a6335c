#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hanover/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod compare;
pub mod export;
pub mod stats;

pub use compare::{CompareError, ComparisonReport, SeriesComparison, compare_series};
pub use export::{ExportError, ExportFormat, frame_to_csv, write_frame_csv};
pub use stats::{ColumnSummary, StatsError, SummaryTable, TableKind, summarize};

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
