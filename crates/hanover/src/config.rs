//! Engine configuration.

use crate::error::{HanoverError, Result};
use hanover_data::Frequency;
use hanover_data::cache::DEFAULT_CAPACITY;
use hanover_factors::FactorName;
use hanover_panel::Characteristic;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration of a [`crate::FactorLibrary`].
///
/// Mirrors the way a study is specified: an observation frequency, the
/// characteristics portfolios are sorted on, the factors to construct, and
/// the characteristics to average within portfolios.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Observation frequency of constructed series
    pub frequency: Frequency,
    /// Characteristics driving the portfolio sorts (one or two)
    pub sort_characteristics: Vec<Characteristic>,
    /// Factors to construct
    pub factors: Vec<FactorName>,
    /// Characteristics averaged per portfolio
    pub portfolio_characteristics: Vec<Characteristic>,
    /// Whether missing query results may be fetched from the warehouse
    /// (`false` serves strictly from the cache)
    pub run_query: bool,
    /// Path of the SQLite query cache; `None` disables the persistent cache
    pub cache_path: Option<PathBuf>,
    /// Capacity of the in-memory result memo
    pub memo_capacity: usize,
}

impl LibraryConfig {
    /// Create a configuration with defaults for the cache knobs.
    pub fn new(
        frequency: Frequency,
        sort_characteristics: Vec<Characteristic>,
        factors: Vec<FactorName>,
        portfolio_characteristics: Vec<Characteristic>,
    ) -> Self {
        Self {
            frequency,
            sort_characteristics,
            factors,
            portfolio_characteristics,
            run_query: true,
            cache_path: None,
            memo_capacity: DEFAULT_CAPACITY,
        }
    }

    /// Point the persistent query cache at a file.
    #[must_use]
    pub fn with_cache_path(mut self, path: PathBuf) -> Self {
        self.cache_path = Some(path);
        self
    }

    /// Serve strictly from the cache, failing on missing query results.
    #[must_use]
    pub const fn cache_only(mut self) -> Self {
        self.run_query = false;
        self
    }

    /// Whether the sorts re-form every period (any prior-return sorting
    /// characteristic) rather than each June.
    pub fn per_period_formation(&self) -> bool {
        self.sort_characteristics.iter().any(|c| !c.is_annual())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.sort_characteristics.is_empty() && self.factors.is_empty() {
            return Err(HanoverError::Config(
                "nothing to construct: no sort characteristics and no factors".to_string(),
            ));
        }
        if self.sort_characteristics.len() > 2 {
            return Err(HanoverError::Config(format!(
                "at most two sorting characteristics are supported, got {}",
                self.sort_characteristics.len()
            )));
        }
        if self.per_period_formation() {
            for c in &self.sort_characteristics {
                if c.is_annual() && *c != Characteristic::Me {
                    return Err(HanoverError::Config(format!(
                        "{c} cannot be combined with a prior-return sort; \
                         only ME re-forms with the prior-return cadence"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Months of history needed before the first requested date, covering
    /// prior-return windows and the fundamentals alignment lag.
    pub fn lookback_months(&self) -> u32 {
        let mut months = 0u32;
        for c in self
            .sort_characteristics
            .iter()
            .chain(&self.portfolio_characteristics)
        {
            let needed = match c {
                // June formation reaches back to December of t-1 and the
                // trailing dividend year.
                Characteristic::Me => 18,
                Characteristic::Prior { k, .. } => k + 2,
                _ => 18,
            };
            months = months.max(needed);
        }
        for f in &self.factors {
            let needed = match f.sort_characteristic() {
                Some(Characteristic::Prior { k, .. }) => k + 2,
                Some(_) => 18,
                None => 1,
            };
            months = months.max(needed);
        }
        months.max(18)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(sorts: Vec<Characteristic>, factors: Vec<FactorName>) -> LibraryConfig {
        LibraryConfig::new(Frequency::Monthly, sorts, factors, vec![])
    }

    #[test]
    fn standard_bivariate_config_is_valid() {
        let cfg = config(vec![Characteristic::Me, Characteristic::Bm], vec![]);
        assert!(cfg.validate().is_ok());
        assert!(!cfg.per_period_formation());
    }

    #[test]
    fn momentum_sort_forms_per_period() {
        let cfg = config(
            vec![Characteristic::Me, Characteristic::MOMENTUM],
            vec![],
        );
        assert!(cfg.validate().is_ok());
        assert!(cfg.per_period_formation());
    }

    #[test]
    fn annual_ratio_cannot_join_prior_sort() {
        let cfg = config(
            vec![Characteristic::Bm, Characteristic::MOMENTUM],
            vec![],
        );
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_config_is_rejected() {
        assert!(config(vec![], vec![]).validate().is_err());
    }

    #[test]
    fn three_way_sort_is_rejected() {
        let cfg = config(
            vec![Characteristic::Me, Characteristic::Bm, Characteristic::Op],
            vec![],
        );
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn lookback_covers_long_reversal() {
        let cfg = config(
            vec![Characteristic::Me, Characteristic::LONG_TERM_REVERSAL],
            vec![],
        );
        assert_eq!(cfg.lookback_months(), 62);
    }

    #[test]
    fn lookback_floor_is_eighteen_months() {
        let cfg = config(vec![Characteristic::Me], vec![]);
        assert_eq!(cfg.lookback_months(), 18);
    }

    #[test]
    fn factor_lookback_counts_too() {
        let cfg = config(vec![], vec![FactorName::LtRev]);
        assert_eq!(cfg.lookback_months(), 62);
    }
}
