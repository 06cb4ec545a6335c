//! Long-short combinations of 2x3 bucket portfolios.
//!
//! The published factors other than the market are built from six
//! value-weighted portfolios: a NYSE-median size split crossed with 30/70
//! terciles of a second characteristic. The factor is the average of the
//! two extreme-tercile legs on the long side minus the average on the short
//! side; the size factor averages the small terciles against the big ones.

use crate::error::{FactorError, Result};
use polars::prelude::*;

/// Which tercile the factor goes long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeLeg {
    /// Long the high tercile (HML, RMW, MOM style)
    High,
    /// Long the low tercile (CMA, reversal style)
    Low,
}

/// The six leg names of a 2x3 sort, `(size bucket, tercile bucket)`.
const SIXTHS: [(i32, i32, &str); 6] = [
    (1, 1, "s_lo"),
    (1, 2, "s_mid"),
    (1, 3, "s_hi"),
    (2, 1, "b_lo"),
    (2, 2, "b_mid"),
    (2, 3, "b_hi"),
];

fn leg_aggregations() -> Vec<Expr> {
    SIXTHS
        .iter()
        .map(|(size, tercile, name)| {
            col("ret")
                .filter(
                    col("size_bucket")
                        .eq(lit(*size))
                        .and(col("sort_bucket").eq(lit(*tercile))),
                )
                .mean()
                .alias(*name)
        })
        .collect()
}

fn validate_sixths(sixths: &LazyFrame) -> Result<()> {
    let schema = sixths
        .clone()
        .collect_schema()
        .map_err(FactorError::Polars)?;
    for required in ["date", "size_bucket", "sort_bucket", "ret"] {
        if !schema.iter_names().any(|n| n.as_str() == required) {
            return Err(FactorError::MissingInput(format!(
                "sixths frame lacks column {required}"
            )));
        }
    }
    Ok(())
}

/// Tercile spread of a 2x3 sort: the average of the small and big extreme
/// legs on the long side minus the short side.
///
/// `sixths` holds one row per (period, size bucket, tercile bucket) with a
/// `ret` column; the output has `date` and the spread in `name`. Periods
/// where any leg is missing yield a null spread.
pub fn spread_from_sixths(sixths: LazyFrame, leg: SizeLeg, name: &str) -> Result<LazyFrame> {
    validate_sixths(&sixths)?;
    let (long_small, long_big, short_small, short_big) = match leg {
        SizeLeg::High => ("s_hi", "b_hi", "s_lo", "b_lo"),
        SizeLeg::Low => ("s_lo", "b_lo", "s_hi", "b_hi"),
    };

    Ok(sixths
        .group_by([col("date")])
        .agg(leg_aggregations())
        .with_columns([((col(long_small) + col(long_big)) / lit(2.0)
            - (col(short_small) + col(short_big)) / lit(2.0))
        .alias(name)])
        .select([col("date"), col(name)])
        .sort(["date"], Default::default()))
}

/// Size factor from a 2x3 sort: the average of the three small portfolios
/// minus the average of the three big ones.
pub fn smb_from_sixths(sixths: LazyFrame, name: &str) -> Result<LazyFrame> {
    validate_sixths(&sixths)?;
    Ok(sixths
        .group_by([col("date")])
        .agg(leg_aggregations())
        .with_columns([((col("s_lo") + col("s_mid") + col("s_hi")) / lit(3.0)
            - (col("b_lo") + col("b_mid") + col("b_hi")) / lit(3.0))
        .alias(name)])
        .select([col("date"), col(name)])
        .sort(["date"], Default::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Six portfolios over one period, returns chosen so every combination
    /// is distinguishable.
    fn sixths(with_missing_leg: bool) -> DataFrame {
        let mut size = vec![1i32, 1, 1, 2, 2, 2];
        let mut tercile = vec![1i32, 2, 3, 1, 2, 3];
        let mut ret = vec![0.01f64, 0.02, 0.07, 0.00, 0.01, 0.03];
        let mut date = vec![1i64; 6];
        if with_missing_leg {
            // Second period lacking the big-high leg.
            size.extend([1, 1, 1, 2, 2]);
            tercile.extend([1, 2, 3, 1, 2]);
            ret.extend([0.01, 0.01, 0.01, 0.01, 0.01]);
            date.extend([2i64; 5]);
        }
        DataFrame::new(vec![
            Column::new("date".into(), date),
            Column::new("size_bucket".into(), size),
            Column::new("sort_bucket".into(), tercile),
            Column::new("ret".into(), ret),
        ])
        .unwrap()
    }

    #[test]
    fn high_minus_low_spread() {
        let out = spread_from_sixths(sixths(false).lazy(), SizeLeg::High, "HML")
            .unwrap()
            .collect()
            .unwrap();
        let hml = out.column("HML").unwrap().f64().unwrap();
        // (0.07 + 0.03)/2 - (0.01 + 0.00)/2
        assert_relative_eq!(hml.get(0).unwrap(), 0.045, epsilon = 1e-12);
    }

    #[test]
    fn low_minus_high_spread() {
        let out = spread_from_sixths(sixths(false).lazy(), SizeLeg::Low, "CMA")
            .unwrap()
            .collect()
            .unwrap();
        let cma = out.column("CMA").unwrap().f64().unwrap();
        assert_relative_eq!(cma.get(0).unwrap(), -0.045, epsilon = 1e-12);
    }

    #[test]
    fn smb_averages_three_against_three() {
        let out = smb_from_sixths(sixths(false).lazy(), "SMB")
            .unwrap()
            .collect()
            .unwrap();
        let smb = out.column("SMB").unwrap().f64().unwrap();
        // (0.01+0.02+0.07)/3 - (0.00+0.01+0.03)/3
        assert_relative_eq!(smb.get(0).unwrap(), (0.10 - 0.04) / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn missing_leg_yields_null_factor() {
        let out = spread_from_sixths(sixths(true).lazy(), SizeLeg::High, "HML")
            .unwrap()
            .collect()
            .unwrap();
        assert_eq!(out.height(), 2);
        let hml = out.column("HML").unwrap().f64().unwrap();
        assert!(hml.get(0).is_some());
        assert!(hml.get(1).is_none());
    }

    #[test]
    fn missing_columns_are_rejected() {
        let df = DataFrame::new(vec![
            Column::new("date".into(), vec![1i64]),
            Column::new("ret".into(), vec![0.01f64]),
        ])
        .unwrap();
        assert!(spread_from_sixths(df.lazy(), SizeLeg::High, "HML").is_err());
    }
}
