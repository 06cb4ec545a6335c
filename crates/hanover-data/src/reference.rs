//! Loader for externally published reference factor and portfolio series.
//!
//! The published files are CSV tables with a free-text preamble, a `Date`
//! key column (`YYYYMMDD` daily, `YYYYMM` monthly, `YYYY` annual), values in
//! percent, and `-99.99`/`-999` as missing sentinels. Monthly files append
//! an annual section after a blank line; only the first section is read.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::{Path, PathBuf};

/// Missing-value sentinels used by the published files.
const SENTINELS: &[&str] = &["-99.99", "-999", "-999.0"];

/// Where reference files live.
#[derive(Debug, Clone)]
enum ReferenceSource {
    /// Local directory of CSV files
    Dir(PathBuf),
    /// HTTP base URL serving CSV files
    Url(String),
}

/// Loads published reference series for the comparison layer.
#[derive(Debug, Clone)]
pub struct ReferenceLibrary {
    source: ReferenceSource,
}

impl ReferenceLibrary {
    /// Read reference files from a local directory.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            source: ReferenceSource::Dir(dir.as_ref().to_path_buf()),
        }
    }

    /// Fetch reference files from an HTTP base URL.
    pub fn from_url(base: impl Into<String>) -> Self {
        Self {
            source: ReferenceSource::Url(base.into()),
        }
    }

    /// Load the named series file (e.g. `F-F_Research_Data_Factors.CSV`)
    /// into a tidy frame: a `date` column plus one decimal-return column
    /// per published series.
    pub async fn load(&self, name: &str) -> Result<DataFrame> {
        let text = match &self.source {
            ReferenceSource::Dir(dir) => std::fs::read_to_string(dir.join(name))?,
            ReferenceSource::Url(base) => {
                let url = format!("{}/{}", base.trim_end_matches('/'), name);
                let response = reqwest::get(&url).await.map_err(DataError::Network)?;
                if !response.status().is_success() {
                    return Err(DataError::Reference(format!(
                        "{name}: HTTP {}",
                        response.status()
                    )));
                }
                response.text().await.map_err(DataError::Network)?
            }
        };
        parse_reference_csv(&text)
    }
}

/// Parse the body of a published reference CSV.
pub fn parse_reference_csv(text: &str) -> Result<DataFrame> {
    let lines: Vec<&str> = text.lines().collect();

    // The data block starts at the first row whose leading field is empty or
    // "Date" and whose remaining fields are series names.
    let header_idx = lines
        .iter()
        .position(|line| {
            let mut fields = line.split(',').map(str::trim);
            matches!(fields.next(), Some("" | "Date" | "date")) && fields.clone().count() > 0
        })
        .ok_or_else(|| DataError::Reference("no header row found".to_string()))?;

    let names: Vec<String> = lines[header_idx]
        .split(',')
        .skip(1)
        .map(|s| s.trim().to_string())
        .collect();
    if names.is_empty() || names.iter().any(String::is_empty) {
        return Err(DataError::Reference("malformed header row".to_string()));
    }

    let mut dates: Vec<NaiveDate> = Vec::new();
    let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); names.len()];

    for line in &lines[header_idx + 1..] {
        if line.trim().is_empty() {
            // Blank line separates the primary section from annual addenda.
            break;
        }
        let mut fields = line.split(',').map(str::trim);
        let key = match fields.next() {
            Some(k) if !k.is_empty() && k.chars().all(|c| c.is_ascii_digit()) => k,
            // Footer or annotation rows end the section too.
            _ => break,
        };
        dates.push(parse_date_key(key)?);
        for (i, name) in names.iter().enumerate() {
            let raw = fields.next().ok_or_else(|| {
                DataError::Reference(format!("row {key}: missing value for {name}"))
            })?;
            values[i].push(parse_value(raw)?);
        }
    }

    if dates.is_empty() {
        return Err(DataError::Reference("no data rows found".to_string()));
    }

    let mut cols: Vec<Column> = Vec::with_capacity(names.len() + 1);
    cols.push(Column::new("date".into(), dates));
    for (name, series) in names.iter().zip(values) {
        cols.push(Column::new(name.as_str().into(), series));
    }
    Ok(DataFrame::new(cols)?)
}

/// `YYYYMMDD` is a calendar day, `YYYYMM` the end of a month, `YYYY` the
/// end of a year.
fn parse_date_key(key: &str) -> Result<NaiveDate> {
    let bad = || DataError::Reference(format!("bad date key: {key}"));
    match key.len() {
        8 => NaiveDate::parse_from_str(key, "%Y%m%d").map_err(|_| bad()),
        6 => {
            let year: i32 = key[..4].parse().map_err(|_| bad())?;
            let month: u32 = key[4..].parse().map_err(|_| bad())?;
            end_of_month(year, month).ok_or_else(bad)
        }
        4 => {
            let year: i32 = key.parse().map_err(|_| bad())?;
            NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(bad)
        }
        _ => Err(bad()),
    }
}

/// Percent string to decimal return; sentinels become null.
fn parse_value(raw: &str) -> Result<Option<f64>> {
    if raw.is_empty() || SENTINELS.contains(&raw) {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(|v| Some(v / 100.0))
        .map_err(|e| DataError::Reference(format!("bad value {raw}: {e}")))
}

/// Last calendar day of the month.
pub fn end_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1).and_then(|d| d.pred_opt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLE: &str = "\
This file was created from academic library data.
Value-weight returns in percent.

,Mkt-RF,SMB,HML,RF
192607,    2.96,   -2.56,   -2.43,    0.22
192608,    2.64,   -1.17,    3.82,    0.25
192609,    0.36,   -1.40,    0.13,    0.23
192610,  -99.99,   -0.09,    0.70,    0.32

Annual Factors: January-December
,Mkt-RF,SMB,HML,RF
1927,   29.47,   -2.46,   -3.75,    3.12
";

    #[test]
    fn parses_monthly_section_only() {
        let df = parse_reference_csv(SAMPLE).unwrap();
        assert_eq!(df.height(), 4);
        assert_eq!(df.width(), 5);
        assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);
    }

    #[test]
    fn converts_percent_to_decimal() {
        let df = parse_reference_csv(SAMPLE).unwrap();
        let mkt = df.column("Mkt-RF").unwrap().f64().unwrap();
        assert_relative_eq!(mkt.get(0).unwrap(), 0.0296, epsilon = 1e-12);
    }

    #[test]
    fn sentinel_becomes_null() {
        let df = parse_reference_csv(SAMPLE).unwrap();
        let mkt = df.column("Mkt-RF").unwrap().f64().unwrap();
        assert!(mkt.get(3).is_none());
    }

    #[test]
    fn month_keys_land_on_month_end() {
        let df = parse_reference_csv(SAMPLE).unwrap();
        let dates = df.column("date").unwrap().cast(&DataType::String).unwrap();
        let first = dates.str().unwrap().get(0).unwrap().to_string();
        assert_eq!(first, "1926-07-31");
    }

    #[test]
    fn end_of_month_handles_december_and_leap() {
        assert_eq!(
            end_of_month(1999, 12).unwrap(),
            NaiveDate::from_ymd_opt(1999, 12, 31).unwrap()
        );
        assert_eq!(
            end_of_month(2020, 2).unwrap(),
            NaiveDate::from_ymd_opt(2020, 2, 29).unwrap()
        );
    }

    #[test]
    fn rejects_headerless_text() {
        assert!(parse_reference_csv("just some text\nwith no table").is_err());
    }
}
