//! Portfolio membership propagation and aggregation.

use crate::error::{Result, SortError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How portfolio returns are averaged across members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Weighting {
    /// Market-equity weighted (weights lagged one period)
    #[default]
    Value,
    /// Equal weighted
    Equal,
}

impl Weighting {
    /// Two-letter code used in CLI arguments and table titles.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Value => "vw",
            Self::Equal => "ew",
        }
    }

    /// Parse a `vw`/`ew` code.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vw" | "value" => Ok(Self::Value),
            "ew" | "equal" => Ok(Self::Equal),
            other => Err(SortError::InvalidPercentiles(format!(
                "unknown weighting: {other}"
            ))),
        }
    }
}

impl fmt::Display for Weighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Carry formation-date bucket assignments onto the holding-period return
/// panel.
///
/// `assignments` holds one row per (security, formation key) with the
/// bucket columns; the panel carries the same join keys on every holding
/// period row (June formations stamp July..June with the same key, monthly
/// formations stamp the single holding month). Unassigned securities keep
/// null buckets and drop out of the aggregation.
pub fn join_assignments(
    panel: LazyFrame,
    assignments: LazyFrame,
    keys: &[&str],
    bucket_cols: &[&str],
) -> LazyFrame {
    let mut select: Vec<Expr> = keys.iter().map(|k| col(*k)).collect();
    select.extend(bucket_cols.iter().map(|b| col(*b)));
    let on: Vec<Expr> = keys.iter().map(|k| col(*k)).collect();

    panel.join(
        assignments.select(select),
        on.clone(),
        on,
        JoinArgs::new(JoinType::Left),
    )
}

/// Average member returns per (period, bucket...).
///
/// Output columns: the group keys, `ret` (the requested weighting),
/// and `n_firms`. Value weighting applies the paired-weight rule: a member
/// contributes its weight only when its return is present, and a bucket
/// with no weighted member yields a null return, not zero.
pub fn aggregate_returns(
    panel: LazyFrame,
    date_col: &str,
    bucket_cols: &[&str],
    weight_col: &str,
    weighting: Weighting,
) -> Result<LazyFrame> {
    if bucket_cols.is_empty() {
        return Err(SortError::MissingColumn("bucket columns".to_string()));
    }

    let mut keys: Vec<Expr> = vec![col(date_col)];
    keys.extend(bucket_cols.iter().map(|b| col(*b)));

    let member = bucket_cols
        .iter()
        .fold(col("ret").is_not_null(), |acc, b| {
            acc.and(col(*b).is_not_null())
        });

    let grouped = panel.filter(member).group_by(keys);

    let aggregated = match weighting {
        Weighting::Value => grouped
            .agg([
                (col("ret") * col(weight_col)).sum().alias("ret_x_w"),
                col(weight_col)
                    .filter(col(weight_col).is_not_null())
                    .sum()
                    .alias("w_sum"),
                col("ret")
                    .filter(col(weight_col).is_not_null())
                    .count()
                    .alias("n_firms"),
            ])
            .with_columns([when(col("w_sum").gt(0.0))
                .then(col("ret_x_w") / col("w_sum"))
                .otherwise(lit(NULL))
                .alias("ret")])
            .select([col("*").exclude(["ret_x_w", "w_sum"])]),
        Weighting::Equal => grouped.agg([
            col("ret").mean().alias("ret"),
            col("ret").count().alias("n_firms"),
        ]),
    };

    let mut sort_keys: Vec<PlSmallStr> = vec![date_col.into()];
    sort_keys.extend(bucket_cols.iter().map(|b| PlSmallStr::from(*b)));

    Ok(aggregated.sort(sort_keys, Default::default()))
}

/// Average member characteristics per (period, bucket...), using the same
/// weighting and paired-weight rule as returns.
pub fn aggregate_characteristics(
    panel: LazyFrame,
    date_col: &str,
    bucket_cols: &[&str],
    weight_col: &str,
    charac_cols: &[&str],
    weighting: Weighting,
) -> Result<LazyFrame> {
    if bucket_cols.is_empty() {
        return Err(SortError::MissingColumn("bucket columns".to_string()));
    }
    if charac_cols.is_empty() {
        return Err(SortError::MissingColumn("characteristic columns".to_string()));
    }

    let mut keys: Vec<Expr> = vec![col(date_col)];
    keys.extend(bucket_cols.iter().map(|b| col(*b)));

    let member = bucket_cols
        .iter()
        .fold(lit(true), |acc, b| acc.and(col(*b).is_not_null()));

    let mut aggs: Vec<Expr> = Vec::new();
    let mut posts: Vec<Expr> = Vec::new();
    let mut drops: Vec<String> = Vec::new();
    for &c in charac_cols {
        match weighting {
            Weighting::Value => {
                let num = format!("{c}_x_w");
                let den = format!("{c}_w");
                aggs.push((col(c) * col(weight_col)).sum().alias(&num));
                aggs.push(
                    col(weight_col)
                        .filter(col(c).is_not_null().and(col(weight_col).is_not_null()))
                        .sum()
                        .alias(&den),
                );
                posts.push(
                    when(col(&den).gt(0.0))
                        .then(col(&num) / col(&den))
                        .otherwise(lit(NULL))
                        .alias(c),
                );
                drops.push(num);
                drops.push(den);
            }
            Weighting::Equal => {
                aggs.push(col(c).mean().alias(c));
            }
        }
    }

    let mut result = panel.filter(member).group_by(keys).agg(aggs);
    if !posts.is_empty() {
        let drop_refs: Vec<&str> = drops.iter().map(String::as_str).collect();
        result = result
            .with_columns(posts)
            .select([col("*").exclude(drop_refs)]);
    }

    let mut sort_keys: Vec<PlSmallStr> = vec![date_col.into()];
    sort_keys.extend(bucket_cols.iter().map(|b| PlSmallStr::from(*b)));

    Ok(result.sort(sort_keys, Default::default()))
}
