//! Cross-sectional math utilities shared by the sort engine and the
//! statistics layer.

use crate::error::{Result, SortError};
use polars::prelude::*;

/// Linearly interpolated percentile of a sorted slice.
///
/// Follows the usual numeric-library convention: `p = 0` is the minimum,
/// `p = 1` the maximum, and interior percentiles interpolate between the
/// two bracketing order statistics. The slice must be sorted ascending and
/// free of NaN.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&p) {
        return None;
    }
    let n = sorted.len();
    if n == 1 {
        return Some(sorted[0]);
    }
    let rank = p * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Weighted mean over paired slices, skipping pairs where either side is
/// missing. Returns `None` when no pair survives or the weights sum to zero.
pub fn weighted_mean(values: &[Option<f64>], weights: &[Option<f64>]) -> Option<f64> {
    let mut num = 0.0;
    let mut den = 0.0;
    for (v, w) in values.iter().zip(weights) {
        if let (Some(v), Some(w)) = (v, w) {
            num += v * w;
            den += w;
        }
    }
    if den > 0.0 { Some(num / den) } else { None }
}

/// Winsorize columns cross-sectionally within each `by` group, clamping
/// values outside the `[pct, 1 - pct]` percentile band to the band edges.
pub fn winsorize_xsection(
    frame: LazyFrame,
    columns: &[&str],
    by: &str,
    pct: f64,
) -> Result<LazyFrame> {
    if !(0.0..0.5).contains(&pct) {
        return Err(SortError::InvalidPercentiles(format!(
            "winsorization percentile {pct} outside [0, 0.5)"
        )));
    }
    let mut result = frame;
    for &column in columns {
        let lower = format!("{column}_lower");
        let upper = format!("{column}_upper");
        result = result
            .with_columns([
                col(column)
                    .quantile(lit(pct), QuantileMethod::Linear)
                    .over([col(by)])
                    .alias(&lower),
                col(column)
                    .quantile(lit(1.0 - pct), QuantileMethod::Linear)
                    .over([col(by)])
                    .alias(&upper),
            ])
            .with_columns([when(col(column).is_null())
                .then(lit(NULL))
                .when(col(column).lt(col(&lower)))
                .then(col(&lower))
                .when(col(column).gt(col(&upper)))
                .then(col(&upper))
                .otherwise(col(column))
                .alias(column)])
            .select([col("*").exclude([lower.as_str(), upper.as_str()])]);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 1.0)]
    #[case(0.5, 3.0)]
    #[case(1.0, 5.0)]
    #[case(0.25, 2.0)]
    fn percentile_interpolates(#[case] p: f64, #[case] expected: f64) {
        let sorted = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(percentile_sorted(&sorted, p).unwrap(), expected);
    }

    #[test]
    fn percentile_interpolates_between_points() {
        let sorted = [10.0, 20.0];
        assert_relative_eq!(percentile_sorted(&sorted, 0.3).unwrap(), 13.0);
    }

    #[test]
    fn percentile_edge_cases() {
        assert!(percentile_sorted(&[], 0.5).is_none());
        assert!(percentile_sorted(&[1.0], 1.5).is_none());
        assert_relative_eq!(percentile_sorted(&[7.0], 0.9).unwrap(), 7.0);
    }

    #[test]
    fn weighted_mean_skips_unpaired() {
        let values = [Some(0.10), None, Some(0.20), Some(0.30)];
        let weights = [Some(1.0), Some(9.0), None, Some(3.0)];
        // Only the first and last pairs count: (0.1*1 + 0.3*3) / 4
        assert_relative_eq!(weighted_mean(&values, &weights).unwrap(), 0.25);
    }

    #[test]
    fn weighted_mean_empty_is_none() {
        assert!(weighted_mean(&[None, None], &[Some(1.0), Some(2.0)]).is_none());
        assert!(weighted_mean(&[], &[]).is_none());
    }

    #[test]
    fn winsorize_clamps_tails() {
        let df = DataFrame::new(vec![
            Column::new("date".into(), vec!["a"; 11]),
            Column::new(
                "x".into(),
                vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 100.0],
            ),
        ])
        .unwrap();

        let out = winsorize_xsection(df.lazy(), &["x"], "date", 0.10)
            .unwrap()
            .collect()
            .unwrap();
        let x = out.column("x").unwrap().f64().unwrap();
        let max = x.max().unwrap();
        // The extreme 100.0 is clamped to the 90th percentile of the group.
        assert!(max < 100.0);
        assert_relative_eq!(x.min().unwrap(), 1.0);
    }

    #[test]
    fn winsorize_rejects_bad_pct() {
        let df = DataFrame::new(vec![
            Column::new("date".into(), vec!["a"]),
            Column::new("x".into(), vec![1.0]),
        ])
        .unwrap();
        assert!(winsorize_xsection(df.lazy(), &["x"], "date", 0.6).is_err());
    }
}
