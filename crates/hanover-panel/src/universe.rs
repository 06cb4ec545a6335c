//! Universe filters and market equity.
//!
//! The sortable universe is ordinary common stock (share codes 10 and 11)
//! listed on NYSE, AMEX, or NASDAQ (exchange codes 1, 2, 3). The NYSE flag
//! survives filtering because breakpoints are computed over that subset.

use polars::prelude::*;

/// Restrict a security panel to the sortable universe and flag NYSE
/// listings.
pub fn filter_universe(panel: LazyFrame) -> LazyFrame {
    panel
        .filter(
            col("shrcd")
                .eq(lit(10i32))
                .or(col("shrcd").eq(lit(11i32))),
        )
        .filter(
            col("exchcd")
                .gt_eq(lit(1i32))
                .and(col("exchcd").lt_eq(lit(3i32))),
        )
        .with_columns([col("exchcd").eq(lit(1i32)).alias("nyse")])
}

/// Add market equity in millions: price magnitude times shares outstanding
/// (thousands).
///
/// Prices reported as bid/ask midpoints carry a negative sign in the
/// security master; magnitude is the price either way.
pub fn with_market_equity(panel: LazyFrame) -> LazyFrame {
    panel.with_columns([
        when(col("prc").is_not_null().and(col("shrout").gt(0.0)))
            .then(col("prc").abs() * col("shrout") / lit(1000.0))
            .otherwise(lit(NULL))
            .alias("me"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn raw_panel() -> DataFrame {
        DataFrame::new(vec![
            Column::new("permno".into(), vec![1i64, 2, 3, 4, 5]),
            Column::new("shrcd".into(), vec![10i32, 11, 12, 10, 11]),
            Column::new("exchcd".into(), vec![1i32, 2, 1, 4, 3]),
            Column::new(
                "prc".into(),
                vec![Some(25.0f64), Some(-10.0), Some(30.0), Some(5.0), None],
            ),
            Column::new("shrout".into(), vec![1000.0f64, 2000.0, 500.0, 100.0, 800.0]),
        ])
        .unwrap()
    }

    #[test]
    fn keeps_common_stock_on_major_exchanges() {
        let out = filter_universe(raw_panel().lazy()).collect().unwrap();
        let permnos: Vec<i64> = out
            .column("permno")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        // permno 3 has share code 12, permno 4 is on exchange 4.
        assert_eq!(permnos, vec![1, 2, 5]);
    }

    #[test]
    fn flags_nyse_listings() {
        let out = filter_universe(raw_panel().lazy()).collect().unwrap();
        let nyse: Vec<bool> = out
            .column("nyse")
            .unwrap()
            .bool()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(nyse, vec![true, false, false]);
    }

    #[test]
    fn market_equity_uses_price_magnitude() {
        let out = with_market_equity(raw_panel().lazy()).collect().unwrap();
        let me = out.column("me").unwrap().f64().unwrap();
        assert_relative_eq!(me.get(0).unwrap(), 25.0);
        // Bid/ask midpoint price of -10 still yields positive market equity.
        assert_relative_eq!(me.get(1).unwrap(), 20.0);
    }

    #[test]
    fn missing_price_yields_null_me() {
        let out = with_market_equity(raw_panel().lazy()).collect().unwrap();
        let me = out.column("me").unwrap().f64().unwrap();
        assert!(me.get(4).is_none());
    }
}
