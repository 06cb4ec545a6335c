//! Prior-return characteristics (momentum and reversals).
//!
//! A prior `(j-k)` strategy measures each security's cumulative return over
//! lagged periods `j ..= k` and re-forms every period. At the monthly
//! frequency the window is taken in months; daily strategies use the
//! published day-count mapping of the standard windows.

use crate::characteristics::Characteristic;
use crate::error::{PanelError, Result};
use hanover_data::Frequency;
use polars::prelude::*;

/// Map a monthly prior `(j-k)` window to the measurement window of the
/// source panel.
///
/// Monthly panels use the window as given. Daily panels support only the
/// standard strategies: prior (2-12) becomes days 21-250, prior (1-1)
/// days 1-20, and prior (13-60) days 251-1250.
pub fn prior_window(source: Frequency, j: u32, k: u32) -> Result<(usize, usize)> {
    match source {
        Frequency::Monthly => Ok((j as usize, k as usize)),
        Frequency::Daily => match (j, k) {
            (2, 12) => Ok((21, 250)),
            (1, 1) => Ok((1, 20)),
            (13, 60) => Ok((251, 1250)),
            _ => Err(PanelError::UnsupportedPriorWindow {
                j,
                k,
                frequency: source.to_string(),
            }),
        },
        other => Err(PanelError::InvalidFrequency {
            operation: "prior-return window".to_string(),
            frequency: other.to_string(),
        }),
    }
}

/// Add the prior `(j-k)` cumulative return to a return panel.
///
/// The panel must carry `permno`, `date`, `ret` at the source frequency.
/// The value at period `t` compounds returns over lagged periods
/// `j ..= k`; every period in the window must be present, otherwise the
/// value is null and the security drops out of that formation.
pub fn with_prior_return(
    panel: LazyFrame,
    source: Frequency,
    characteristic: Characteristic,
) -> Result<LazyFrame> {
    let Characteristic::Prior { j, k } = characteristic else {
        return Err(PanelError::UnknownCharacteristic(format!(
            "{characteristic} is not a prior-return strategy"
        )));
    };
    let (jj, kk) = prior_window(source, j, k)?;
    let window = kk - jj + 1;
    let out_col = characteristic.column();

    Ok(panel
        .sort(["permno", "date"], Default::default())
        .with_columns([col("ret")
            .log1p()
            .shift(lit(jj as i64))
            .over([col("permno")])
            .alias("log_ret_shifted")])
        .with_columns([(col("log_ret_shifted")
            .rolling_sum(RollingOptionsFixedWindow {
                window_size: window,
                min_periods: window,
                ..Default::default()
            })
            .over([col("permno")])
            .exp()
            - lit(1.0))
        .alias(&out_col)])
        .select([col("*").exclude(["log_ret_shifted"])]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn monthly_panel(returns: &[f64]) -> DataFrame {
        let dates: Vec<NaiveDate> = (0..returns.len())
            .map(|i| {
                let month = (i % 12) as u32 + 1;
                let year = 2000 + (i / 12) as i32;
                NaiveDate::from_ymd_opt(year, month, 28).unwrap()
            })
            .collect();
        DataFrame::new(vec![
            Column::new("permno".into(), vec![1i64; returns.len()]),
            Column::new("date".into(), dates),
            Column::new("ret".into(), returns.to_vec()),
        ])
        .unwrap()
    }

    #[test]
    fn short_term_reversal_is_last_month_return() {
        let panel = monthly_panel(&[0.10, -0.05, 0.03]);
        let out = with_prior_return(
            panel.lazy(),
            Frequency::Monthly,
            Characteristic::SHORT_TERM_REVERSAL,
        )
        .unwrap()
        .collect()
        .unwrap();

        let prior = out.column("prior_1_1").unwrap().f64().unwrap();
        assert!(prior.get(0).is_none());
        assert_relative_eq!(prior.get(1).unwrap(), 0.10, epsilon = 1e-12);
        assert_relative_eq!(prior.get(2).unwrap(), -0.05, epsilon = 1e-12);
    }

    #[test]
    fn momentum_compounds_eleven_months_skipping_the_latest() {
        // Fourteen months of 1%: at t = 13 (0-based), prior (2-12) compounds
        // months t-12 .. t-2, eleven observations.
        let panel = monthly_panel(&[0.01; 14]);
        let out = with_prior_return(panel.lazy(), Frequency::Monthly, Characteristic::MOMENTUM)
            .unwrap()
            .collect()
            .unwrap();

        let prior = out.column("prior_2_12").unwrap().f64().unwrap();
        // Needs 12 lagged months: first valid at index 12.
        assert!(prior.get(11).is_none());
        assert_relative_eq!(
            prior.get(12).unwrap(),
            1.01f64.powi(11) - 1.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            prior.get(13).unwrap(),
            1.01f64.powi(11) - 1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn window_is_per_security() {
        let df = DataFrame::new(vec![
            Column::new("permno".into(), vec![1i64, 1, 2, 2]),
            Column::new(
                "date".into(),
                vec![
                    NaiveDate::from_ymd_opt(2000, 1, 31).unwrap(),
                    NaiveDate::from_ymd_opt(2000, 2, 29).unwrap(),
                    NaiveDate::from_ymd_opt(2000, 1, 31).unwrap(),
                    NaiveDate::from_ymd_opt(2000, 2, 29).unwrap(),
                ],
            ),
            Column::new("ret".into(), vec![0.10f64, 0.0, 0.50, 0.0]),
        ])
        .unwrap();

        let out = with_prior_return(
            df.lazy(),
            Frequency::Monthly,
            Characteristic::SHORT_TERM_REVERSAL,
        )
        .unwrap()
        .sort(["permno", "date"], Default::default())
        .collect()
        .unwrap();

        let prior = out.column("prior_1_1").unwrap().f64().unwrap();
        assert_relative_eq!(prior.get(1).unwrap(), 0.10, epsilon = 1e-12);
        // Security 2 must not see security 1's history.
        assert!(prior.get(2).is_none());
        assert_relative_eq!(prior.get(3).unwrap(), 0.50, epsilon = 1e-12);
    }

    #[test]
    fn daily_windows_follow_published_mapping() {
        assert_eq!(prior_window(Frequency::Daily, 2, 12).unwrap(), (21, 250));
        assert_eq!(prior_window(Frequency::Daily, 1, 1).unwrap(), (1, 20));
        assert_eq!(
            prior_window(Frequency::Daily, 13, 60).unwrap(),
            (251, 1250)
        );
        assert!(prior_window(Frequency::Daily, 3, 6).is_err());
    }

    #[test]
    fn monthly_windows_pass_through() {
        assert_eq!(prior_window(Frequency::Monthly, 3, 6).unwrap(), (3, 6));
    }

    #[test]
    fn non_source_frequency_is_rejected() {
        assert!(prior_window(Frequency::Quarterly, 2, 12).is_err());
        assert!(prior_window(Frequency::Weekly, 2, 12).is_err());
    }

    #[test]
    fn non_prior_characteristic_is_rejected() {
        let panel = monthly_panel(&[0.01, 0.02]);
        assert!(
            with_prior_return(panel.lazy(), Frequency::Monthly, Characteristic::Bm).is_err()
        );
    }
}
