//! Frequency conversion and return-panel helpers.
//!
//! Weekly series compound the daily panel; quarterly and annual series
//! compound the monthly panel. Compounding is `exp(sum(ln(1 + r))) - 1`
//! within each (group, period) cell, carrying the last value of
//! state columns such as market equity.

use crate::error::{PanelError, Result};
use hanover_data::Frequency;
use polars::prelude::*;

/// Expression producing the period key of `date` at the target frequency.
///
/// Weeks run Monday through Sunday (the epoch day, 1970-01-01, was a
/// Thursday, hence the 3-day shift before dividing).
pub fn period_key(frequency: Frequency) -> Expr {
    let year = col("date").dt().year().cast(DataType::Int64);
    let month = col("date").dt().month().cast(DataType::Int64);
    match frequency {
        Frequency::Daily => col("date").cast(DataType::Int32).cast(DataType::Int64),
        Frequency::Weekly => {
            // Key each date by the Monday starting its week: day zero of the
            // Date dtype was a Thursday, three days past a Monday.
            let days = col("date").cast(DataType::Int32).cast(DataType::Int64);
            days.clone() - ((days + lit(3i64)) % lit(7i64))
        }
        Frequency::Monthly => year * lit(100i64) + month,
        Frequency::Quarterly => {
            let quarter = when(month.clone().lt_eq(lit(3i64)))
                .then(lit(1i64))
                .when(month.clone().lt_eq(lit(6i64)))
                .then(lit(2i64))
                .when(month.lt_eq(lit(9i64)))
                .then(lit(3i64))
                .otherwise(lit(4i64));
            year * lit(10i64) + quarter
        }
        Frequency::Annual => year,
    }
}

/// Compound `value_cols` of a frame into periods at the target frequency.
///
/// Groups by `group_cols` plus the period; each cell keeps its last `date`,
/// the compounded value columns, and the last observation of each carry
/// column. Cells where a value column is entirely missing compound to null,
/// not zero.
pub fn compound_to(
    frame: LazyFrame,
    to: Frequency,
    group_cols: &[&str],
    value_cols: &[&str],
    carry_cols: &[&str],
) -> Result<LazyFrame> {
    if value_cols.is_empty() {
        return Err(PanelError::MissingColumn("value columns".to_string()));
    }

    let mut sort_cols: Vec<PlSmallStr> =
        group_cols.iter().map(|c| PlSmallStr::from(*c)).collect();
    sort_cols.push("date".into());

    let mut keys: Vec<Expr> = group_cols.iter().map(|c| col(*c)).collect();
    keys.push(col("period"));

    let mut aggs: Vec<Expr> = vec![col("date").last().alias("date")];
    for &v in value_cols {
        aggs.push(
            when(col(v).count().gt(lit(0u32)))
                .then(col(v).log1p().sum().exp() - lit(1.0))
                .otherwise(lit(NULL))
                .alias(v),
        );
    }
    for &c in carry_cols {
        aggs.push(col(c).last().alias(c));
    }

    let mut out_sort: Vec<PlSmallStr> =
        group_cols.iter().map(|c| PlSmallStr::from(*c)).collect();
    out_sort.push("date".into());

    Ok(frame
        .sort(sort_cols, Default::default())
        .with_columns([period_key(to).alias("period")])
        .group_by(keys)
        .agg(aggs)
        .select([col("*").exclude(["period"])])
        .sort(out_sort, Default::default()))
}

/// Lag market equity one period per security; the lagged value is the
/// portfolio weight for the period's return.
pub fn with_lagged_me(panel: LazyFrame) -> LazyFrame {
    panel
        .sort(["permno", "date"], Default::default())
        .with_columns([col("me")
            .shift(lit(1))
            .over([col("permno")])
            .alias("me_lag")])
}

/// Stamp each observation with its June-formation year: July of year `t`
/// through June of `t + 1` belong to the formation of June `t`.
pub fn stamp_formation_year(panel: LazyFrame) -> LazyFrame {
    let year = col("date").dt().year().cast(DataType::Int64);
    let month = col("date").dt().month().cast(DataType::Int64);
    panel.with_columns([when(month.gt_eq(lit(7i64)))
        .then(year.clone())
        .otherwise(year - lit(1i64))
        .alias("form_year")])
}
