//! Bucket assignment against a breakpoint grid.

use crate::breakpoints::breakpoint_column;
use crate::error::{Result, SortError};
use polars::prelude::*;

/// Join breakpoints onto a formation frame and assign each security to a
/// bucket `1 ..= n` by comparing `value_col` to the grid.
///
/// Assignment is inclusive on the left grid edge: `x <= bp_1` lands in
/// bucket 1, `bp_{i-1} < x <= bp_i` in bucket `i`, and anything above the
/// last breakpoint in bucket `n`. Securities with a missing characteristic
/// (or a formation date with null breakpoints) stay unassigned.
///
/// `breaks` is the output of [`crate::breakpoints::nyse_breakpoints`] and is
/// joined on the `by` column. The assignment lands in `bucket_col` as Int32.
pub fn assign_buckets(
    frame: LazyFrame,
    breaks: LazyFrame,
    value_col: &str,
    by: &str,
    n_buckets: usize,
    bucket_col: &str,
) -> Result<LazyFrame> {
    if n_buckets < 2 {
        return Err(SortError::InvalidDimension(n_buckets));
    }
    let n_breaks = n_buckets - 1;

    let joined = frame.join(
        breaks,
        [col(by)],
        [col(by)],
        JoinArgs::new(JoinType::Left),
    );

    let first = breakpoint_column(1);
    let last = breakpoint_column(n_breaks);

    let mut branches: Vec<(Expr, i32)> =
        vec![(col(value_col).lt_eq(col(&first)), 1)];
    for i in 2..=n_breaks {
        let prev = breakpoint_column(i - 1);
        let this = breakpoint_column(i);
        branches.push((
            col(value_col)
                .gt(col(&prev))
                .and(col(value_col).lt_eq(col(&this))),
            i as i32,
        ));
    }
    branches.push((col(value_col).gt(col(&last)), n_buckets as i32));

    let mut assignment = lit(NULL);
    for (condition, bucket) in branches.into_iter().rev() {
        assignment = when(condition).then(lit(bucket)).otherwise(assignment);
    }
    let assignment = assignment.alias(bucket_col);

    let mut drop: Vec<String> = (1..=n_breaks).map(breakpoint_column).collect();
    drop.push("n_obs".to_string());
    let drop_refs: Vec<&str> = drop.iter().map(String::as_str).collect();

    Ok(joined
        .with_columns([assignment])
        .select([col("*").exclude(drop_refs)]))
}

/// Display labels for an `n`-way sort, matching the published tables:
/// `Lo`/`Hi` for a split, `Lo 2 Hi` for terciles, and `Lo, 2, .., Hi` for
/// wider grids.
pub fn bucket_labels(n: usize) -> Vec<String> {
    match n {
        0 | 1 => Vec::new(),
        2 => vec!["Lo".to_string(), "Hi".to_string()],
        _ => (1..=n)
            .map(|i| {
                if i == 1 {
                    "Lo".to_string()
                } else if i == n {
                    "Hi".to_string()
                } else {
                    i.to_string()
                }
            })
            .collect(),
    }
}
