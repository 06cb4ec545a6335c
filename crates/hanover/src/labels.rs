//! Portfolio naming and wide-table presentation.
//!
//! Aggregation works on integer bucket columns; presentation uses the
//! published naming conventions: `Small`/`Big` for a size split, `Lo`/`Hi`
//! ends for splits and terciles, and `{CHARAC}{i}` for wider grids. A
//! bivariate portfolio joins its two dimension labels with a space
//! (`Small LoBM`, `ME2 BM4`).

use crate::error::Result;
use hanover_panel::Characteristic;
use polars::prelude::*;
use std::collections::BTreeMap;

/// Labels of the `n` buckets of one sorting dimension.
pub fn dimension_labels(characteristic: Characteristic, n: usize) -> Vec<String> {
    let tag = characteristic.label().replace('_', "");
    match n {
        0 | 1 => Vec::new(),
        2 if characteristic == Characteristic::Me => {
            vec!["Small".to_string(), "Big".to_string()]
        }
        2 => vec![format!("Lo{tag}"), format!("Hi{tag}")],
        3 => vec![format!("Lo{tag}"), format!("{tag}2"), format!("Hi{tag}")],
        _ => (1..=n).map(|i| format!("{tag}{i}")).collect(),
    }
}

/// Name of the portfolio at 1-based bucket indices.
pub fn portfolio_name(
    dims: &[(Characteristic, usize)],
    buckets: &[usize],
) -> Option<String> {
    if dims.len() != buckets.len() {
        return None;
    }
    let mut parts = Vec::with_capacity(dims.len());
    for ((characteristic, n), &bucket) in dims.iter().zip(buckets) {
        let labels = dimension_labels(*characteristic, *n);
        parts.push(labels.get(bucket.checked_sub(1)?)?.clone());
    }
    Some(parts.join(" "))
}

/// Pivot a long (date, bucket.., value) frame into a wide table with one
/// named portfolio column per bucket combination, ordered first by the
/// first dimension, then the second.
///
/// `long` must carry `date`, the bucket columns (Int32, 1-based), and
/// `value_col`. Dates with no observation for a portfolio get nulls.
pub fn widen_portfolios(
    long: &DataFrame,
    dims: &[(Characteristic, usize)],
    bucket_cols: &[&str],
    value_col: &str,
) -> Result<DataFrame> {
    let height = long.height();
    let dates = long.column("date")?;
    let date_is_calendar = dates.dtype() == &DataType::Date;

    let date_keys: Vec<Option<i64>> = dates.cast(&DataType::Int64)?.i64()?.into_iter().collect();

    // Unique dates in ascending order.
    let mut positions: BTreeMap<i64, usize> = BTreeMap::new();
    for key in date_keys.iter().flatten() {
        positions.entry(*key).or_default();
    }
    for (i, slot) in positions.values_mut().enumerate() {
        *slot = i;
    }
    let n_dates = positions.len();

    // All bucket combinations in presentation order.
    let mut combos: Vec<Vec<usize>> = vec![vec![]];
    for (_, n) in dims {
        let mut next = Vec::new();
        for combo in combos {
            for i in 1..=*n {
                let mut extended = combo.clone();
                extended.push(i);
                next.push(extended);
            }
        }
        combos = next;
    }

    let mut column_of: BTreeMap<Vec<usize>, usize> = BTreeMap::new();
    let mut names: Vec<String> = Vec::with_capacity(combos.len());
    for (idx, combo) in combos.iter().enumerate() {
        column_of.insert(combo.clone(), idx);
        names.push(portfolio_name(dims, combo).unwrap_or_else(|| format!("P{idx}")));
    }

    let mut cells: Vec<Vec<Option<f64>>> = vec![vec![None; n_dates]; combos.len()];
    let values: Vec<Option<f64>> = long
        .column(value_col)?
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .collect();
    let mut bucket_values: Vec<Vec<Option<i32>>> = Vec::with_capacity(bucket_cols.len());
    for b in bucket_cols {
        bucket_values.push(
            long.column(b)?
                .cast(&DataType::Int32)?
                .i32()?
                .into_iter()
                .collect(),
        );
    }

    for row in 0..height {
        let Some(date_key) = date_keys[row] else {
            continue;
        };
        let mut combo = Vec::with_capacity(bucket_cols.len());
        let mut complete = true;
        for bucket_col in &bucket_values {
            match bucket_col[row] {
                Some(b) if b >= 1 => combo.push(b as usize),
                _ => {
                    complete = false;
                    break;
                }
            }
        }
        if !complete {
            continue;
        }
        if let (Some(&col_idx), Some(&row_idx)) =
            (column_of.get(&combo), positions.get(&date_key))
        {
            cells[col_idx][row_idx] = values[row];
        }
    }

    // Rebuild the date column in sorted order with the original dtype.
    let sorted_keys: Vec<i64> = positions.keys().copied().collect();
    let date_col = if date_is_calendar {
        Column::new("date".into(), sorted_keys)
            .cast(&DataType::Int32)?
            .cast(&DataType::Date)?
    } else {
        Column::new("date".into(), sorted_keys)
    };

    let mut out: Vec<Column> = vec![date_col];
    for (name, series) in names.iter().zip(cells) {
        out.push(Column::new(name.as_str().into(), series));
    }
    Ok(DataFrame::new(out)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn size_split_uses_small_big() {
        assert_eq!(
            dimension_labels(Characteristic::Me, 2),
            vec!["Small", "Big"]
        );
    }

    #[test]
    fn tercile_labels_have_lo_hi_ends() {
        assert_eq!(
            dimension_labels(Characteristic::Bm, 3),
            vec!["LoBM", "BM2", "HiBM"]
        );
    }

    #[test]
    fn wide_grids_are_numbered() {
        let labels = dimension_labels(Characteristic::Me, 5);
        assert_eq!(labels[0], "ME1");
        assert_eq!(labels[4], "ME5");
    }

    #[test]
    fn prior_tag_drops_underscores() {
        let labels = dimension_labels(Characteristic::MOMENTUM, 3);
        assert_eq!(labels[0], "LoPRIOR212");
    }

    #[test]
    fn bivariate_names_join_dimensions() {
        let dims = [(Characteristic::Me, 2), (Characteristic::Bm, 3)];
        assert_eq!(portfolio_name(&dims, &[1, 1]).unwrap(), "Small LoBM");
        assert_eq!(portfolio_name(&dims, &[2, 3]).unwrap(), "Big HiBM");
        assert!(portfolio_name(&dims, &[3, 1]).is_none());
    }

    #[test]
    fn widen_builds_one_column_per_portfolio() {
        let d1 = NaiveDate::from_ymd_opt(2001, 1, 31).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2001, 2, 28).unwrap();
        let long = DataFrame::new(vec![
            Column::new("date".into(), vec![d1, d1, d2]),
            Column::new("b1".into(), vec![1i32, 2, 1]),
            Column::new("ret".into(), vec![0.01f64, 0.02, 0.03]),
        ])
        .unwrap();

        let wide = widen_portfolios(
            &long,
            &[(Characteristic::Me, 2)],
            &["b1"],
            "ret",
        )
        .unwrap();

        assert_eq!(wide.shape(), (2, 3));
        let small = wide.column("Small").unwrap().f64().unwrap();
        let big = wide.column("Big").unwrap().f64().unwrap();
        assert_eq!(small.get(0), Some(0.01));
        assert_eq!(small.get(1), Some(0.03));
        assert_eq!(big.get(0), Some(0.02));
        // Missing (Feb, Big) cell is null.
        assert!(big.get(1).is_none());
    }

    #[test]
    fn widen_bivariate_order_is_row_major() {
        let d1 = NaiveDate::from_ymd_opt(2001, 1, 31).unwrap();
        let long = DataFrame::new(vec![
            Column::new("date".into(), vec![d1; 4]),
            Column::new("b1".into(), vec![1i32, 1, 2, 2]),
            Column::new("b2".into(), vec![1i32, 2, 1, 2]),
            Column::new("ret".into(), vec![0.01f64, 0.02, 0.03, 0.04]),
        ])
        .unwrap();

        let wide = widen_portfolios(
            &long,
            &[(Characteristic::Me, 2), (Characteristic::Bm, 2)],
            &["b1", "b2"],
            "ret",
        )
        .unwrap();

        let names: Vec<String> = wide
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            names,
            vec!["date", "Small LoBM", "Small HiBM", "Big LoBM", "Big HiBM"]
        );
    }
}
