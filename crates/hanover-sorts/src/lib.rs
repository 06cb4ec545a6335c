#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hanover/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod assign;
pub mod breakpoints;
pub mod error;
pub mod math;
pub mod portfolio;

pub use assign::{assign_buckets, bucket_labels};
pub use breakpoints::{BreakpointUniverse, nyse_breakpoints};
pub use error::{Result, SortError};
pub use portfolio::{Weighting, aggregate_characteristics, aggregate_returns, join_assignments};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
