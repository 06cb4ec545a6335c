//! Market return and market excess return.

use crate::error::{FactorError, Result};
use polars::prelude::*;

/// Value-weighted market return per period, in excess of the risk-free
/// rate.
///
/// `panel` is the full eligible universe with `date`, `ret`, and `me_lag`
/// (no sorting restrictions: securities missing a characteristic still
/// belong to the market). `risk_free` carries `date` and `rf` at the same
/// frequency. Output: `date`, `MKT` (the value-weighted market return),
/// `RF`, and `MKT-RF`.
pub fn market_excess_return(panel: LazyFrame, risk_free: LazyFrame) -> Result<LazyFrame> {
    let schema = panel.clone().collect_schema().map_err(FactorError::Polars)?;
    for required in ["date", "ret", "me_lag"] {
        if !schema.iter_names().any(|n| n.as_str() == required) {
            return Err(FactorError::MissingInput(format!(
                "market panel lacks column {required}"
            )));
        }
    }

    let market = panel
        .filter(col("ret").is_not_null().and(col("me_lag").is_not_null()))
        .group_by([col("date")])
        .agg([
            (col("ret") * col("me_lag")).sum().alias("ret_x_w"),
            col("me_lag").sum().alias("w_sum"),
        ])
        .with_columns([when(col("w_sum").gt(0.0))
            .then(col("ret_x_w") / col("w_sum"))
            .otherwise(lit(NULL))
            .alias("MKT")])
        .select([col("date"), col("MKT")]);

    Ok(market
        .join(
            risk_free.select([col("date"), col("rf").alias("RF")]),
            [col("date")],
            [col("date")],
            JoinArgs::new(JoinType::Left),
        )
        .with_columns([(col("MKT") - col("RF")).alias("MKT-RF")])
        .sort(["date"], Default::default()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn panel() -> DataFrame {
        DataFrame::new(vec![
            Column::new("date".into(), vec![1i64, 1, 1, 2, 2]),
            Column::new(
                "ret".into(),
                vec![Some(0.10f64), Some(-0.02), None, Some(0.05), Some(0.01)],
            ),
            Column::new(
                "me_lag".into(),
                vec![Some(100.0f64), Some(300.0), Some(600.0), Some(200.0), None],
            ),
        ])
        .unwrap()
    }

    fn risk_free() -> DataFrame {
        DataFrame::new(vec![
            Column::new("date".into(), vec![1i64, 2]),
            Column::new("rf".into(), vec![0.003f64, 0.004]),
        ])
        .unwrap()
    }

    #[test]
    fn value_weighted_market_skips_incomplete_rows() {
        let out = market_excess_return(panel().lazy(), risk_free().lazy())
            .unwrap()
            .collect()
            .unwrap();

        let mkt = out.column("MKT").unwrap().f64().unwrap();
        // Period 1: (0.10*100 - 0.02*300) / 400; the 600-weight row has no
        // return and contributes nothing.
        assert_relative_eq!(mkt.get(0).unwrap(), 0.01, epsilon = 1e-12);
        // Period 2: only the weighted row counts.
        assert_relative_eq!(mkt.get(1).unwrap(), 0.05, epsilon = 1e-12);
    }

    #[test]
    fn excess_return_subtracts_risk_free() {
        let out = market_excess_return(panel().lazy(), risk_free().lazy())
            .unwrap()
            .collect()
            .unwrap();

        let excess = out.column("MKT-RF").unwrap().f64().unwrap();
        assert_relative_eq!(excess.get(0).unwrap(), 0.007, epsilon = 1e-12);
        assert_relative_eq!(excess.get(1).unwrap(), 0.046, epsilon = 1e-12);
    }

    #[test]
    fn missing_inputs_are_rejected() {
        let df = DataFrame::new(vec![Column::new("date".into(), vec![1i64])]).unwrap();
        assert!(market_excess_return(df.lazy(), risk_free().lazy()).is_err());
    }
}
