#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hanover/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod long_short;
pub mod market;
pub mod registry;

pub use error::{FactorError, Result};
pub use long_short::{SizeLeg, smb_from_sixths, spread_from_sixths};
pub use market::market_excess_return;
pub use registry::{FactorName, available_factors, factor_info};

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
