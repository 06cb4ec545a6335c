//! Delisting-adjusted returns.
//!
//! Dropping securities at delisting overstates performance; the final
//! return must fold in the proceeds (or loss) of the delisting event. When
//! a security delists for cause without a reported delisting return, a
//! -30% return is imputed, following the standard treatment of
//! performance-related delistings.

use polars::prelude::*;

/// Imputed delisting return for for-cause delistings missing `dlret`.
const IMPUTED_DELIST_RETURN: f64 = -0.30;

/// Whether a delisting code is "for cause" (performance-related): code 500
/// or 520-584.
fn for_cause() -> Expr {
    col("dlstcd").eq(lit(500i32)).or(col("dlstcd")
        .gt_eq(lit(520i32))
        .and(col("dlstcd").lt_eq(lit(584i32))))
}

/// Merge delisting events onto a return panel and adjust the affected
/// period's return.
///
/// `delistings` carries one row per delisting: `permno`, `date` (aligned to
/// the panel's period grid upstream), `dlret`, `dlstcd`. On the delisting
/// period the return becomes `(1 + ret)(1 + dlret) - 1`, with a missing
/// `ret` treated as zero; a for-cause delisting with no reported `dlret`
/// uses the imputed return; any other missing delisting return leaves the
/// period untouched.
pub fn adjust_for_delistings(panel: LazyFrame, delistings: LazyFrame) -> LazyFrame {
    let events = delistings.select([col("permno"), col("date"), col("dlret"), col("dlstcd")]);

    panel
        .join(
            events,
            [col("permno"), col("date")],
            [col("permno"), col("date")],
            JoinArgs::new(JoinType::Left),
        )
        .with_columns([when(col("dlret").is_not_null())
            .then((col("ret").fill_null(0.0) + lit(1.0)) * (col("dlret") + lit(1.0)) - lit(1.0))
            .when(col("dlstcd").is_not_null().and(for_cause()))
            .then(
                (col("ret").fill_null(0.0) + lit(1.0)) * lit(1.0 + IMPUTED_DELIST_RETURN)
                    - lit(1.0),
            )
            .otherwise(col("ret"))
            .alias("ret")])
        .select([col("*").exclude(["dlret", "dlstcd"])])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn date(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(1998, m, 28).unwrap()
    }

    fn panel() -> DataFrame {
        DataFrame::new(vec![
            Column::new("permno".into(), vec![1i64, 1, 2, 3, 4]),
            Column::new(
                "date".into(),
                vec![date(1), date(2), date(2), date(2), date(2)],
            ),
            Column::new(
                "ret".into(),
                vec![Some(0.05f64), Some(0.10), None, Some(0.02), Some(0.01)],
            ),
        ])
        .unwrap()
    }

    fn delistings() -> DataFrame {
        DataFrame::new(vec![
            Column::new("permno".into(), vec![1i64, 2, 3]),
            Column::new("date".into(), vec![date(2), date(2), date(2)]),
            Column::new("dlret".into(), vec![Some(-0.15f64), None, None]),
            Column::new("dlstcd".into(), vec![Some(100i32), Some(551), Some(231)]),
        ])
        .unwrap()
    }

    fn adjusted() -> DataFrame {
        adjust_for_delistings(panel().lazy(), delistings().lazy())
            .sort(["permno", "date"], Default::default())
            .collect()
            .unwrap()
    }

    #[test]
    fn reported_delisting_return_compounds() {
        let out = adjusted();
        let ret = out.column("ret").unwrap().f64().unwrap();
        // permno 1, Feb: (1.10)(0.85) - 1
        assert_relative_eq!(ret.get(1).unwrap(), -0.065, epsilon = 1e-12);
        // Non-delisting period untouched.
        assert_relative_eq!(ret.get(0).unwrap(), 0.05, epsilon = 1e-12);
    }

    #[test]
    fn for_cause_without_dlret_is_imputed() {
        let out = adjusted();
        let ret = out.column("ret").unwrap().f64().unwrap();
        // permno 2: no period return, code 551 -> imputed -30%.
        assert_relative_eq!(ret.get(2).unwrap(), -0.30, epsilon = 1e-12);
    }

    #[test]
    fn benign_code_without_dlret_is_untouched() {
        let out = adjusted();
        let ret = out.column("ret").unwrap().f64().unwrap();
        // permno 3: code 231 (exchange change), no dlret -> keep period return.
        assert_relative_eq!(ret.get(3).unwrap(), 0.02, epsilon = 1e-12);
    }

    #[test]
    fn securities_without_events_are_untouched() {
        let out = adjusted();
        let ret = out.column("ret").unwrap().f64().unwrap();
        assert_relative_eq!(ret.get(4).unwrap(), 0.01, epsilon = 1e-12);
    }

    #[test]
    fn event_columns_are_dropped() {
        let out = adjusted();
        assert!(out.column("dlret").is_err());
        assert!(out.column("dlstcd").is_err());
    }
}
