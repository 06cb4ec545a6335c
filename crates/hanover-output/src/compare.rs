//! Comparison of constructed series against published reference series.
//!
//! Aligns the two frames on their overlapping dates and, for each series
//! present on both sides, reports the Pearson correlation and side-by-side
//! means and standard deviations. High correlations are the acceptance
//! criterion of a reconstruction.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur while comparing series.
#[derive(Debug, Error)]
pub enum CompareError {
    /// The frames share no series names
    #[error("No overlapping series between constructed and reference frames")]
    NoSharedSeries,

    /// The frames share no dates
    #[error("No overlapping dates between constructed and reference frames")]
    NoOverlap,

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}

/// Comparison of one constructed series against its reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesComparison {
    /// Series name
    pub name: String,
    /// Number of overlapping observations with both sides present
    pub overlap: usize,
    /// Pearson correlation over the overlap
    pub correlation: Option<f64>,
    /// Mean of the constructed series over the overlap
    pub mean_constructed: Option<f64>,
    /// Mean of the reference series over the overlap
    pub mean_reference: Option<f64>,
    /// Standard deviation of the constructed series over the overlap
    pub std_constructed: Option<f64>,
    /// Standard deviation of the reference series over the overlap
    pub std_reference: Option<f64>,
}

/// Full comparison report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Per-series comparisons
    pub series: Vec<SeriesComparison>,
}

impl ComparisonReport {
    /// Lowest correlation across the compared series.
    pub fn min_correlation(&self) -> Option<f64> {
        self.series
            .iter()
            .filter_map(|s| s.correlation)
            .fold(None, |acc, c| Some(acc.map_or(c, |a: f64| a.min(c))))
    }

    /// Average correlation across the compared series.
    pub fn mean_correlation(&self) -> Option<f64> {
        let correlations: Vec<f64> = self.series.iter().filter_map(|s| s.correlation).collect();
        if correlations.is_empty() {
            None
        } else {
            Some(correlations.iter().sum::<f64>() / correlations.len() as f64)
        }
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();
        output.push_str("\nComparison against reference series\n");
        output.push_str(&"-".repeat(76));
        output.push('\n');
        output.push_str(&format!(
            "{:<12} {:>8} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
            "series", "overlap", "corr", "mean", "ref mean", "std", "ref std"
        ));
        output.push_str(&"-".repeat(76));
        output.push('\n');

        let pct = |v: Option<f64>| v.map_or("-".to_string(), |x| format!("{:.2}%", x * 100.0));
        let plain = |v: Option<f64>| v.map_or("-".to_string(), |x| format!("{:.4}", x));

        for s in &self.series {
            output.push_str(&format!(
                "{:<12} {:>8} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
                s.name,
                s.overlap,
                plain(s.correlation),
                pct(s.mean_constructed),
                pct(s.mean_reference),
                pct(s.std_constructed),
                pct(s.std_reference),
            ));
        }
        output.push_str(&"-".repeat(76));
        output.push('\n');
        if let (Some(min), Some(mean)) = (self.min_correlation(), self.mean_correlation()) {
            output.push_str(&format!(
                "correlation: min {:.4}, mean {:.4}\n",
                min, mean
            ));
        }
        output
    }
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ascii_table())
    }
}

fn moments(values: &[f64]) -> (Option<f64>, Option<f64>) {
    if values.is_empty() {
        return (None, None);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = if values.len() > 1 {
        Some(
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt(),
        )
    } else {
        None
    };
    (Some(mean), std)
}

fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    let n = xs.len() as f64;
    let mx = xs.iter().sum::<f64>() / n;
    let my = ys.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx).powi(2);
        vy += (y - my).powi(2);
    }
    if vx <= 0.0 || vy <= 0.0 {
        return None;
    }
    Some(cov / (vx.sqrt() * vy.sqrt()))
}

/// Compare a constructed frame against a reference frame.
///
/// Both frames carry a `date` column plus one column per series; series are
/// matched by name. The comparison covers dates present on both sides where
/// both values are non-missing.
pub fn compare_series(
    constructed: &DataFrame,
    reference: &DataFrame,
) -> Result<ComparisonReport, CompareError> {
    let shared: Vec<String> = constructed
        .get_column_names()
        .iter()
        .filter(|n| n.as_str() != "date")
        .filter(|n| {
            reference
                .get_column_names()
                .iter()
                .any(|r| r.as_str() == n.as_str())
        })
        .map(|n| n.to_string())
        .collect();
    if shared.is_empty() {
        return Err(CompareError::NoSharedSeries);
    }

    let mut ref_select: Vec<Expr> = vec![col("date")];
    for name in &shared {
        ref_select.push(col(name.as_str()).alias(format!("{name}__ref")));
    }

    let joined = constructed
        .clone()
        .lazy()
        .join(
            reference.clone().lazy().select(ref_select),
            [col("date")],
            [col("date")],
            JoinArgs::new(JoinType::Inner),
        )
        .sort(["date"], Default::default())
        .collect()?;
    if joined.height() == 0 {
        return Err(CompareError::NoOverlap);
    }

    let mut series = Vec::with_capacity(shared.len());
    for name in &shared {
        let own: Vec<Option<f64>> = joined
            .column(name)?
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .collect();
        let other: Vec<Option<f64>> = joined
            .column(&format!("{name}__ref"))?
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .collect();

        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for (x, y) in own.iter().zip(&other) {
            if let (Some(x), Some(y)) = (x, y) {
                xs.push(*x);
                ys.push(*y);
            }
        }

        let (mean_constructed, std_constructed) = moments(&xs);
        let (mean_reference, std_reference) = moments(&ys);
        series.push(SeriesComparison {
            name: name.clone(),
            overlap: xs.len(),
            correlation: pearson(&xs, &ys),
            mean_constructed,
            mean_reference,
            std_constructed,
            std_reference,
        });
    }

    Ok(ComparisonReport { series })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn dates(n: usize) -> Vec<NaiveDate> {
        (0..n)
            .map(|i| NaiveDate::from_ymd_opt(2001, (i + 1) as u32, 28).unwrap())
            .collect()
    }

    #[test]
    fn identical_series_correlate_perfectly() {
        let constructed = DataFrame::new(vec![
            Column::new("date".into(), dates(4)),
            Column::new("SMB".into(), vec![0.01f64, -0.02, 0.03, 0.00]),
        ])
        .unwrap();
        let reference = constructed.clone();

        let report = compare_series(&constructed, &reference).unwrap();
        assert_eq!(report.series.len(), 1);
        let smb = &report.series[0];
        assert_eq!(smb.overlap, 4);
        assert_relative_eq!(smb.correlation.unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(
            smb.mean_constructed.unwrap(),
            smb.mean_reference.unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn anti_correlated_series() {
        let constructed = DataFrame::new(vec![
            Column::new("date".into(), dates(3)),
            Column::new("HML".into(), vec![0.01f64, -0.02, 0.03]),
        ])
        .unwrap();
        let reference = DataFrame::new(vec![
            Column::new("date".into(), dates(3)),
            Column::new("HML".into(), vec![-0.01f64, 0.02, -0.03]),
        ])
        .unwrap();

        let report = compare_series(&constructed, &reference).unwrap();
        assert_relative_eq!(
            report.series[0].correlation.unwrap(),
            -1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn overlap_excludes_missing_values() {
        let constructed = DataFrame::new(vec![
            Column::new("date".into(), dates(4)),
            Column::new(
                "SMB".into(),
                vec![Some(0.01f64), None, Some(0.03), Some(0.02)],
            ),
        ])
        .unwrap();
        let reference = DataFrame::new(vec![
            Column::new("date".into(), dates(4)),
            Column::new(
                "SMB".into(),
                vec![Some(0.01f64), Some(0.00), None, Some(0.02)],
            ),
        ])
        .unwrap();

        let report = compare_series(&constructed, &reference).unwrap();
        assert_eq!(report.series[0].overlap, 2);
    }

    #[test]
    fn disjoint_dates_error() {
        let constructed = DataFrame::new(vec![
            Column::new("date".into(), dates(2)),
            Column::new("SMB".into(), vec![0.01f64, 0.02]),
        ])
        .unwrap();
        let later: Vec<NaiveDate> = (0..2)
            .map(|i| NaiveDate::from_ymd_opt(2015, (i + 1) as u32, 28).unwrap())
            .collect();
        let reference = DataFrame::new(vec![
            Column::new("date".into(), later),
            Column::new("SMB".into(), vec![0.01f64, 0.02]),
        ])
        .unwrap();

        assert!(matches!(
            compare_series(&constructed, &reference),
            Err(CompareError::NoOverlap)
        ));
    }

    #[test]
    fn no_shared_series_error() {
        let constructed = DataFrame::new(vec![
            Column::new("date".into(), dates(2)),
            Column::new("SMB".into(), vec![0.01f64, 0.02]),
        ])
        .unwrap();
        let reference = DataFrame::new(vec![
            Column::new("date".into(), dates(2)),
            Column::new("HML".into(), vec![0.01f64, 0.02]),
        ])
        .unwrap();

        assert!(matches!(
            compare_series(&constructed, &reference),
            Err(CompareError::NoSharedSeries)
        ));
    }

    #[test]
    fn report_aggregates_and_renders() {
        let constructed = DataFrame::new(vec![
            Column::new("date".into(), dates(3)),
            Column::new("SMB".into(), vec![0.01f64, -0.02, 0.03]),
            Column::new("HML".into(), vec![0.02f64, 0.00, -0.01]),
        ])
        .unwrap();
        let report = compare_series(&constructed, &constructed.clone()).unwrap();

        assert_relative_eq!(report.min_correlation().unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(report.mean_correlation().unwrap(), 1.0, epsilon = 1e-12);
        let text = report.to_ascii_table();
        assert!(text.contains("SMB"));
        assert!(text.contains("corr"));
    }
}
