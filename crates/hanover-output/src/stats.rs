//! Detailed summary-statistics tables.
//!
//! One column summary per series: observation count, moments, extremes,
//! mean absolute deviation, percentiles, and the first/last valid dates
//! when the frame carries a `date` column. Return-type tables render in
//! percent.

use chrono::NaiveDate;
use hanover_sorts::math::percentile_sorted;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default percentile grid of the summary tables.
pub const DEFAULT_PERCENTILES: &[f64] = &[0.01, 0.10, 0.25, 0.50, 0.75, 0.90, 0.99];

/// Errors that can occur while summarizing.
#[derive(Debug, Error)]
pub enum StatsError {
    /// Frame has no numeric columns to summarize
    #[error("No numeric columns to summarize")]
    NoColumns,

    /// Percentile outside (0, 1)
    #[error("Invalid percentile: {0}")]
    InvalidPercentile(f64),

    /// Polars error
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}

/// What the summarized series are; drives number formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableKind {
    /// Portfolio return series (percent rendering)
    Returns,
    /// Factor return series (percent rendering)
    Factors,
    /// Firm counts (integer rendering)
    NumFirms,
    /// Average portfolio characteristics
    Characs,
}

impl TableKind {
    /// Title fragment used in table headers.
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Returns => "Returns",
            Self::Factors => "Factors",
            Self::NumFirms => "NumFirms",
            Self::Characs => "Characs",
        }
    }

    const fn percent(&self) -> bool {
        matches!(self, Self::Returns | Self::Factors)
    }
}

/// Summary statistics of one series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSummary {
    /// Series name
    pub name: String,
    /// Number of non-missing observations
    pub count: usize,
    /// Sample mean
    pub mean: Option<f64>,
    /// Sample standard deviation
    pub std: Option<f64>,
    /// Minimum
    pub min: Option<f64>,
    /// Maximum
    pub max: Option<f64>,
    /// Adjusted sample skewness
    pub skew: Option<f64>,
    /// Excess sample kurtosis
    pub kurt: Option<f64>,
    /// Mean absolute deviation from the mean
    pub mad: Option<f64>,
    /// `(percentile, value)` pairs
    pub percentiles: Vec<(f64, f64)>,
    /// First date with a valid observation
    pub start: Option<NaiveDate>,
    /// Last date with a valid observation
    pub end: Option<NaiveDate>,
}

/// A summary table over the numeric columns of a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryTable {
    /// What the series are
    pub kind: TableKind,
    /// Observation frequency code shown in the header
    pub frequency: String,
    /// Per-series summaries
    pub columns: Vec<ColumnSummary>,
}

/// Summarize every numeric column of a frame.
///
/// `ptiles` defaults to 1/10/25/50/75/90/99 when empty. A `date` column is
/// used for start/end dates and excluded from the summaries.
pub fn summarize(
    frame: &DataFrame,
    kind: TableKind,
    frequency: &str,
    ptiles: &[f64],
) -> Result<SummaryTable, StatsError> {
    let ptiles = if ptiles.is_empty() {
        DEFAULT_PERCENTILES
    } else {
        ptiles
    };
    for &p in ptiles {
        if !(0.0..1.0).contains(&p) || p == 0.0 {
            return Err(StatsError::InvalidPercentile(p));
        }
    }

    let dates: Option<Vec<Option<NaiveDate>>> = frame
        .column("date")
        .ok()
        .and_then(|c| c.cast(&DataType::String).ok())
        .and_then(|c| {
            c.str().ok().map(|texts| {
                texts
                    .into_iter()
                    .map(|t| t.and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()))
                    .collect()
            })
        });

    let mut columns = Vec::new();
    for column in frame.get_columns() {
        if column.name().as_str() == "date" {
            continue;
        }
        let values: Vec<Option<f64>> = match column.dtype() {
            DataType::Float64 => column.f64()?.into_iter().collect(),
            DataType::Float32 | DataType::Int64 | DataType::Int32 | DataType::UInt32
            | DataType::UInt64 => column
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .collect(),
            _ => continue,
        };
        columns.push(summarize_column(
            column.name().as_str(),
            &values,
            dates.as_deref(),
            ptiles,
        ));
    }

    if columns.is_empty() {
        return Err(StatsError::NoColumns);
    }

    Ok(SummaryTable {
        kind,
        frequency: frequency.to_string(),
        columns,
    })
}

fn summarize_column(
    name: &str,
    values: &[Option<f64>],
    dates: Option<&[Option<NaiveDate>]>,
    ptiles: &[f64],
) -> ColumnSummary {
    let valid: Vec<f64> = values.iter().flatten().copied().collect();
    let n = valid.len();

    let (start, end) = match dates {
        Some(dates) => {
            let mut start = None;
            let mut end = None;
            for (v, d) in values.iter().zip(dates) {
                if v.is_some() && d.is_some() {
                    if start.is_none() {
                        start = *d;
                    }
                    end = *d;
                }
            }
            (start, end)
        }
        None => (None, None),
    };

    if n == 0 {
        return ColumnSummary {
            name: name.to_string(),
            count: 0,
            mean: None,
            std: None,
            min: None,
            max: None,
            skew: None,
            kurt: None,
            mad: None,
            percentiles: Vec::new(),
            start,
            end,
        };
    }

    let nf = n as f64;
    let mean = valid.iter().sum::<f64>() / nf;
    let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
    let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mad = valid.iter().map(|v| (v - mean).abs()).sum::<f64>() / nf;

    let std = if n > 1 {
        let ss = valid.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
        Some((ss / (nf - 1.0)).sqrt())
    } else {
        None
    };

    // Adjusted Fisher-Pearson skewness and excess kurtosis, the small-sample
    // corrections the usual statistics packages report.
    let skew = match std {
        Some(s) if n > 2 && s > 0.0 => {
            let m3 = valid.iter().map(|v| ((v - mean) / s).powi(3)).sum::<f64>();
            Some(nf / ((nf - 1.0) * (nf - 2.0)) * m3)
        }
        _ => None,
    };
    let kurt = match std {
        Some(s) if n > 3 && s > 0.0 => {
            let m4 = valid.iter().map(|v| ((v - mean) / s).powi(4)).sum::<f64>();
            let lead = nf * (nf + 1.0) / ((nf - 1.0) * (nf - 2.0) * (nf - 3.0));
            let tail = 3.0 * (nf - 1.0).powi(2) / ((nf - 2.0) * (nf - 3.0));
            Some(lead * m4 - tail)
        }
        _ => None,
    };

    let mut sorted = valid.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let percentiles = ptiles
        .iter()
        .filter_map(|&p| percentile_sorted(&sorted, p).map(|v| (p, v)))
        .collect();

    ColumnSummary {
        name: name.to_string(),
        count: n,
        mean: Some(mean),
        std,
        min: Some(min),
        max: Some(max),
        skew,
        kurt,
        mad: Some(mad),
        percentiles,
        start,
        end,
    }
}

impl SummaryTable {
    fn format_value(&self, value: Option<f64>) -> String {
        match value {
            None => String::from("-"),
            Some(v) => match self.kind {
                TableKind::Returns | TableKind::Factors => format!("{:.2}%", v * 100.0),
                TableKind::NumFirms => format!("{:.0}", v),
                TableKind::Characs => format!("{:.4}", v),
            },
        }
    }

    /// Format as ASCII table for terminal display: one column per series,
    /// one row per statistic.
    pub fn to_ascii_table(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "\nSummary: {} (frequency {})\n",
            self.kind.title(),
            self.frequency
        ));
        let width = 14 * (self.columns.len() + 1);
        output.push_str(&"=".repeat(width));
        output.push('\n');

        output.push_str(&format!("{:<14}", "stat"));
        for column in &self.columns {
            output.push_str(&format!("{:>14}", column.name));
        }
        output.push('\n');
        output.push_str(&"-".repeat(width));
        output.push('\n');

        let mut push_row = |label: &str, cells: Vec<String>| {
            output.push_str(&format!("{:<14}", label));
            for cell in cells {
                output.push_str(&format!("{:>14}", cell));
            }
            output.push('\n');
        };

        push_row(
            "startdate",
            self.columns
                .iter()
                .map(|c| c.start.map_or("-".to_string(), |d| d.to_string()))
                .collect(),
        );
        push_row(
            "enddate",
            self.columns
                .iter()
                .map(|c| c.end.map_or("-".to_string(), |d| d.to_string()))
                .collect(),
        );
        push_row(
            "count",
            self.columns.iter().map(|c| c.count.to_string()).collect(),
        );
        push_row(
            "mean",
            self.columns
                .iter()
                .map(|c| self.format_value(c.mean))
                .collect(),
        );
        push_row(
            "std",
            self.columns
                .iter()
                .map(|c| self.format_value(c.std))
                .collect(),
        );
        push_row(
            "min",
            self.columns
                .iter()
                .map(|c| self.format_value(c.min))
                .collect(),
        );

        if let Some(first) = self.columns.first() {
            for (i, (p, _)) in first.percentiles.iter().enumerate() {
                push_row(
                    &format!("{:.0}%", p * 100.0),
                    self.columns
                        .iter()
                        .map(|c| self.format_value(c.percentiles.get(i).map(|(_, v)| *v)))
                        .collect(),
                );
            }
        }

        push_row(
            "max",
            self.columns
                .iter()
                .map(|c| self.format_value(c.max))
                .collect(),
        );
        push_row(
            "skew",
            self.columns
                .iter()
                .map(|c| c.skew.map_or("-".to_string(), |v| format!("{:.2}", v)))
                .collect(),
        );
        push_row(
            "kurt",
            self.columns
                .iter()
                .map(|c| c.kurt.map_or("-".to_string(), |v| format!("{:.2}", v)))
                .collect(),
        );
        push_row(
            "mad",
            self.columns
                .iter()
                .map(|c| self.format_value(c.mad))
                .collect(),
        );

        output.push_str(&"=".repeat(width));
        output.push('\n');
        output
    }
}

impl fmt::Display for SummaryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ascii_table())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn factor_frame() -> DataFrame {
        let dates: Vec<NaiveDate> = (1..=4)
            .map(|m| NaiveDate::from_ymd_opt(2001, m, 28).unwrap())
            .collect();
        DataFrame::new(vec![
            Column::new("date".into(), dates),
            Column::new(
                "SMB".into(),
                vec![Some(0.01f64), Some(-0.02), Some(0.03), Some(0.02)],
            ),
            Column::new(
                "HML".into(),
                vec![None::<f64>, Some(0.01), Some(0.01), Some(0.01)],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn summarizes_each_numeric_column() {
        let table = summarize(&factor_frame(), TableKind::Factors, "M", &[]).unwrap();
        assert_eq!(table.columns.len(), 2);

        let smb = &table.columns[0];
        assert_eq!(smb.name, "SMB");
        assert_eq!(smb.count, 4);
        assert_relative_eq!(smb.mean.unwrap(), 0.01, epsilon = 1e-12);
        assert_relative_eq!(smb.min.unwrap(), -0.02, epsilon = 1e-12);
        assert_relative_eq!(smb.max.unwrap(), 0.03, epsilon = 1e-12);
    }

    #[test]
    fn start_date_skips_leading_nulls() {
        let table = summarize(&factor_frame(), TableKind::Factors, "M", &[]).unwrap();
        let hml = &table.columns[1];
        assert_eq!(hml.count, 3);
        assert_eq!(hml.start, Some(NaiveDate::from_ymd_opt(2001, 2, 28).unwrap()));
        assert_eq!(hml.end, Some(NaiveDate::from_ymd_opt(2001, 4, 28).unwrap()));
    }

    #[test]
    fn sample_std_matches_hand_calculation() {
        let table = summarize(&factor_frame(), TableKind::Factors, "M", &[]).unwrap();
        let smb = &table.columns[0];
        // Values 0.01, -0.02, 0.03, 0.02 with mean 0.01.
        let ss: f64 = [0.01f64, -0.02, 0.03, 0.02]
            .iter()
            .map(|v| (v - 0.01).powi(2))
            .sum();
        assert_relative_eq!(smb.std.unwrap(), (ss / 3.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn median_percentile_present_by_default() {
        let table = summarize(&factor_frame(), TableKind::Factors, "M", &[]).unwrap();
        let smb = &table.columns[0];
        let median = smb
            .percentiles
            .iter()
            .find(|(p, _)| (*p - 0.5).abs() < 1e-12)
            .map(|(_, v)| *v)
            .unwrap();
        assert_relative_eq!(median, 0.015, epsilon = 1e-12);
    }

    #[test]
    fn percent_rendering_for_factor_tables() {
        let table = summarize(&factor_frame(), TableKind::Factors, "M", &[]).unwrap();
        let text = table.to_ascii_table();
        assert!(text.contains('%'));
        assert!(text.contains("SMB"));
        assert!(text.contains("startdate"));
    }

    #[test]
    fn rejects_percentile_out_of_range() {
        assert!(summarize(&factor_frame(), TableKind::Factors, "M", &[1.5]).is_err());
    }

    #[test]
    fn rejects_frame_without_numeric_columns() {
        let df = DataFrame::new(vec![Column::new(
            "name".into(),
            vec!["a".to_string(), "b".to_string()],
        )])
        .unwrap();
        assert!(matches!(
            summarize(&df, TableKind::Factors, "M", &[]),
            Err(StatsError::NoColumns)
        ));
    }

    #[test]
    fn all_null_column_summary_is_empty() {
        let df = DataFrame::new(vec![
            Column::new("x".into(), vec![None::<f64>, None]),
        ])
        .unwrap();
        let table = summarize(&df, TableKind::Characs, "M", &[]).unwrap();
        assert_eq!(table.columns[0].count, 0);
        assert!(table.columns[0].mean.is_none());
    }
}
