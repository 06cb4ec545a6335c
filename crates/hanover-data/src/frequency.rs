//! Observation frequencies for panels and constructed series.

use crate::error::{DataError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Observation frequency of a panel or return series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    /// Daily observations
    Daily,
    /// Weekly observations (ISO weeks, compounded from daily)
    Weekly,
    /// Monthly observations
    Monthly,
    /// Quarterly observations (compounded from monthly)
    Quarterly,
    /// Annual observations (compounded from monthly)
    Annual,
}

impl Frequency {
    /// One-letter code used in query keys and table output.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Daily => "D",
            Self::Weekly => "W",
            Self::Monthly => "M",
            Self::Quarterly => "Q",
            Self::Annual => "A",
        }
    }

    /// Parse a one-letter frequency code.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "D" => Ok(Self::Daily),
            "W" => Ok(Self::Weekly),
            "M" => Ok(Self::Monthly),
            "Q" => Ok(Self::Quarterly),
            "A" | "Y" => Ok(Self::Annual),
            other => Err(DataError::UnknownFrequency(other.to_string())),
        }
    }

    /// The native warehouse panel this frequency is derived from.
    ///
    /// Weekly series compound the daily file; quarterly and annual series
    /// compound the monthly file.
    pub const fn source(&self) -> Self {
        match self {
            Self::Daily | Self::Weekly => Self::Daily,
            Self::Monthly | Self::Quarterly | Self::Annual => Self::Monthly,
        }
    }

    /// Approximate number of observations per calendar year.
    pub const fn periods_per_year(&self) -> u32 {
        match self {
            Self::Daily => 252,
            Self::Weekly => 52,
            Self::Monthly => 12,
            Self::Quarterly => 4,
            Self::Annual => 1,
        }
    }

    /// Whether series at this frequency are re-formed more often than once
    /// a year (relevant for prior-return sorting strategies).
    pub const fn is_intra_year(&self) -> bool {
        matches!(self, Self::Daily | Self::Weekly | Self::Monthly)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("D", Frequency::Daily)]
    #[case("w", Frequency::Weekly)]
    #[case("M", Frequency::Monthly)]
    #[case("q", Frequency::Quarterly)]
    #[case("A", Frequency::Annual)]
    #[case("Y", Frequency::Annual)]
    fn parse_codes(#[case] code: &str, #[case] expected: Frequency) {
        assert_eq!(Frequency::parse(code).unwrap(), expected);
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!(Frequency::parse("H").is_err());
    }

    #[test]
    fn source_panels() {
        assert_eq!(Frequency::Weekly.source(), Frequency::Daily);
        assert_eq!(Frequency::Quarterly.source(), Frequency::Monthly);
        assert_eq!(Frequency::Annual.source(), Frequency::Monthly);
        assert_eq!(Frequency::Daily.source(), Frequency::Daily);
    }

    #[test]
    fn display_round_trips() {
        for freq in [
            Frequency::Daily,
            Frequency::Weekly,
            Frequency::Monthly,
            Frequency::Quarterly,
            Frequency::Annual,
        ] {
            assert_eq!(Frequency::parse(&freq.to_string()).unwrap(), freq);
        }
    }
}
