//! Percentile breakpoints per formation date.
//!
//! The published sorting methodology anchors breakpoints on NYSE-listed
//! firms: all securities are bucketed, but the percentile grid is computed
//! over the NYSE subset only. `BreakpointUniverse::All` widens the grid to
//! every security carrying the characteristic.

use crate::error::{Result, SortError};
use polars::prelude::*;

/// Which securities the percentile grid is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BreakpointUniverse {
    /// NYSE-listed firms only (rows where the `nyse` column is true)
    #[default]
    Nyse,
    /// Every security with a non-missing characteristic
    All,
}

/// Name of the `i`-th (1-based) breakpoint column.
pub fn breakpoint_column(i: usize) -> String {
    format!("bp_{i}")
}

/// Validate a percentile grid: non-empty, strictly increasing, inside (0, 1).
fn validate_percentiles(percentiles: &[f64]) -> Result<()> {
    if percentiles.is_empty() {
        return Err(SortError::InvalidPercentiles("empty grid".to_string()));
    }
    for window in percentiles.windows(2) {
        if window[0] >= window[1] {
            return Err(SortError::InvalidPercentiles(format!(
                "{} >= {}",
                window[0], window[1]
            )));
        }
    }
    if percentiles[0] <= 0.0 || percentiles[percentiles.len() - 1] >= 1.0 {
        return Err(SortError::InvalidPercentiles(
            "percentiles must lie strictly inside (0, 1)".to_string(),
        ));
    }
    Ok(())
}

/// The evenly spaced grid for an `n`-way sort (e.g. quintiles for `n = 5`).
pub fn even_grid(n: usize) -> Result<Vec<f64>> {
    if n < 2 {
        return Err(SortError::InvalidDimension(n));
    }
    Ok((1..n).map(|i| i as f64 / n as f64).collect())
}

/// Compute linearly interpolated percentile breakpoints of `value_col` per
/// formation date.
///
/// `frame` must carry `by` (the formation date column) and, for the NYSE
/// universe, a boolean `nyse` column. The output has one row per formation
/// date with `bp_1 ..= bp_k` columns plus `n_obs`, the number of securities
/// the grid was computed from. Dates with fewer securities than buckets
/// yield null breakpoints.
pub fn nyse_breakpoints(
    frame: LazyFrame,
    value_col: &str,
    by: &str,
    percentiles: &[f64],
    universe: BreakpointUniverse,
) -> Result<LazyFrame> {
    validate_percentiles(percentiles)?;
    let min_obs = (percentiles.len() + 1) as u32;

    let base = match universe {
        BreakpointUniverse::Nyse => frame.filter(col("nyse")),
        BreakpointUniverse::All => frame,
    }
    .filter(col(value_col).is_not_null());

    let mut aggs: Vec<Expr> = percentiles
        .iter()
        .enumerate()
        .map(|(i, p)| {
            col(value_col)
                .quantile(lit(*p), QuantileMethod::Linear)
                .alias(breakpoint_column(i + 1))
        })
        .collect();
    aggs.push(col(value_col).count().alias("n_obs"));

    let guards: Vec<Expr> = (1..=percentiles.len())
        .map(|i| {
            let name = breakpoint_column(i);
            when(col("n_obs").gt_eq(lit(min_obs)))
                .then(col(&name))
                .otherwise(lit(NULL))
                .alias(&name)
        })
        .collect();

    Ok(base
        .group_by([col(by)])
        .agg(aggs)
        .with_columns(guards)
        .sort([by], Default::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn formation_frame() -> DataFrame {
        // Ten NYSE firms with ME 1..=10 and two non-NYSE outliers that must
        // not move the grid.
        let mut me: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let mut nyse = vec![true; 10];
        me.extend([1000.0, 2000.0]);
        nyse.extend([false, false]);
        let n = me.len();

        DataFrame::new(vec![
            Column::new("form".into(), vec![1i64; n]),
            Column::new("me".into(), me),
            Column::new("nyse".into(), nyse),
        ])
        .unwrap()
    }

    #[test]
    fn median_uses_nyse_subset_only() {
        let out = nyse_breakpoints(
            formation_frame().lazy(),
            "me",
            "form",
            &[0.5],
            BreakpointUniverse::Nyse,
        )
        .unwrap()
        .collect()
        .unwrap();

        let bp = out.column("bp_1").unwrap().f64().unwrap().get(0).unwrap();
        assert_relative_eq!(bp, 5.5);
        assert_eq!(
            out.column("n_obs").unwrap().u32().unwrap().get(0),
            Some(10)
        );
    }

    #[test]
    fn all_universe_includes_outliers() {
        let out = nyse_breakpoints(
            formation_frame().lazy(),
            "me",
            "form",
            &[0.5],
            BreakpointUniverse::All,
        )
        .unwrap()
        .collect()
        .unwrap();

        let bp = out.column("bp_1").unwrap().f64().unwrap().get(0).unwrap();
        assert!(bp > 5.5);
    }

    #[test]
    fn tercile_grid_interpolates() {
        let out = nyse_breakpoints(
            formation_frame().lazy(),
            "me",
            "form",
            &[0.3, 0.7],
            BreakpointUniverse::Nyse,
        )
        .unwrap()
        .collect()
        .unwrap();

        // 30th/70th percentiles of 1..=10 under linear interpolation.
        let lo = out.column("bp_1").unwrap().f64().unwrap().get(0).unwrap();
        let hi = out.column("bp_2").unwrap().f64().unwrap().get(0).unwrap();
        assert_relative_eq!(lo, 3.7, epsilon = 1e-12);
        assert_relative_eq!(hi, 7.3, epsilon = 1e-12);
    }

    #[test]
    fn sparse_date_yields_null_breakpoints() {
        let df = DataFrame::new(vec![
            Column::new("form".into(), vec![1i64, 1]),
            Column::new("me".into(), vec![3.0f64, 8.0]),
            Column::new("nyse".into(), vec![true, true]),
        ])
        .unwrap();

        // Quintile sort needs at least five firms.
        let out = nyse_breakpoints(
            df.lazy(),
            "me",
            "form",
            &even_grid(5).unwrap(),
            BreakpointUniverse::Nyse,
        )
        .unwrap()
        .collect()
        .unwrap();

        assert!(out.column("bp_1").unwrap().f64().unwrap().get(0).is_none());
    }

    #[test]
    fn even_grid_values() {
        assert_eq!(even_grid(2).unwrap(), vec![0.5]);
        assert_eq!(even_grid(4).unwrap(), vec![0.25, 0.5, 0.75]);
        assert!(even_grid(1).is_err());
    }

    #[test]
    fn rejects_unordered_grid() {
        let result = nyse_breakpoints(
            formation_frame().lazy(),
            "me",
            "form",
            &[0.7, 0.3],
            BreakpointUniverse::Nyse,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_boundary_percentiles() {
        let result = nyse_breakpoints(
            formation_frame().lazy(),
            "me",
            "form",
            &[0.0, 0.5],
            BreakpointUniverse::Nyse,
        );
        assert!(result.is_err());
    }
}
