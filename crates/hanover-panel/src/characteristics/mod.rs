//! Derived sorting characteristics.
//!
//! Annual characteristics (everything except the prior-return strategies)
//! are measured once a year from accounting data and December/June market
//! equity, and hold from July of the formation year through the following
//! June. Prior-return characteristics re-form every period from the return
//! history itself.

pub mod annual;
pub mod prior;

use crate::error::{PanelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A sortable security characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Characteristic {
    /// Market equity (size), measured each June
    Me,
    /// Book-to-market equity
    Bm,
    /// Operating profitability
    Op,
    /// Investment (annual asset growth)
    Inv,
    /// Earnings-to-price
    Ep,
    /// Cash-flow-to-price
    Cfp,
    /// Dividend yield
    Dp,
    /// Accruals
    Ac,
    /// Net share issuance
    Ni,
    /// Cumulative prior return over lagged periods `j ..= k`
    Prior {
        /// First lagged period of the measurement window
        j: u32,
        /// Last lagged period of the measurement window
        k: u32,
    },
}

impl Characteristic {
    /// The momentum strategy, prior (2-12) returns.
    pub const MOMENTUM: Self = Self::Prior { j: 2, k: 12 };
    /// The short-term reversal strategy, prior (1-1) returns.
    pub const SHORT_TERM_REVERSAL: Self = Self::Prior { j: 1, k: 1 };
    /// The long-term reversal strategy, prior (13-60) returns.
    pub const LONG_TERM_REVERSAL: Self = Self::Prior { j: 13, k: 60 };

    /// Published label, e.g. `ME`, `BM`, `PRIOR_2_12`.
    pub fn label(&self) -> String {
        match self {
            Self::Me => "ME".to_string(),
            Self::Bm => "BM".to_string(),
            Self::Op => "OP".to_string(),
            Self::Inv => "INV".to_string(),
            Self::Ep => "EP".to_string(),
            Self::Cfp => "CFP".to_string(),
            Self::Dp => "DP".to_string(),
            Self::Ac => "AC".to_string(),
            Self::Ni => "NI".to_string(),
            Self::Prior { j, k } => format!("PRIOR_{j}_{k}"),
        }
    }

    /// Panel column holding the characteristic's value.
    pub fn column(&self) -> String {
        self.label().to_ascii_lowercase()
    }

    /// Parse a published label.
    pub fn parse(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.as_str() {
            "ME" => Ok(Self::Me),
            "BM" | "BE-ME" => Ok(Self::Bm),
            "OP" => Ok(Self::Op),
            "INV" => Ok(Self::Inv),
            "EP" | "E-P" => Ok(Self::Ep),
            "CFP" | "CF-P" => Ok(Self::Cfp),
            "DP" | "D-P" => Ok(Self::Dp),
            "AC" => Ok(Self::Ac),
            "NI" => Ok(Self::Ni),
            _ => {
                let parts: Vec<&str> = upper.split('_').collect();
                if let ["PRIOR", j, k] = parts.as_slice() {
                    let j: u32 = j
                        .parse()
                        .map_err(|_| PanelError::UnknownCharacteristic(s.to_string()))?;
                    let k: u32 = k
                        .parse()
                        .map_err(|_| PanelError::UnknownCharacteristic(s.to_string()))?;
                    if j == 0 || k < j {
                        return Err(PanelError::UnknownCharacteristic(s.to_string()));
                    }
                    Ok(Self::Prior { j, k })
                } else {
                    Err(PanelError::UnknownCharacteristic(s.to_string()))
                }
            }
        }
    }

    /// Whether the characteristic is measured annually (June formation)
    /// rather than re-formed every period.
    pub const fn is_annual(&self) -> bool {
        !matches!(self, Self::Prior { .. })
    }
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ME", Characteristic::Me)]
    #[case("bm", Characteristic::Bm)]
    #[case("OP", Characteristic::Op)]
    #[case("INV", Characteristic::Inv)]
    #[case("PRIOR_2_12", Characteristic::MOMENTUM)]
    #[case("prior_1_1", Characteristic::SHORT_TERM_REVERSAL)]
    #[case("PRIOR_13_60", Characteristic::LONG_TERM_REVERSAL)]
    fn parse_labels(#[case] label: &str, #[case] expected: Characteristic) {
        assert_eq!(Characteristic::parse(label).unwrap(), expected);
    }

    #[test]
    fn label_round_trips() {
        for c in [
            Characteristic::Me,
            Characteristic::Ep,
            Characteristic::Ni,
            Characteristic::Prior { j: 2, k: 12 },
        ] {
            assert_eq!(Characteristic::parse(&c.label()).unwrap(), c);
        }
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Characteristic::parse("XYZ").is_err());
        assert!(Characteristic::parse("PRIOR_12_2").is_err());
        assert!(Characteristic::parse("PRIOR_0_5").is_err());
        assert!(Characteristic::parse("PRIOR_abc_5").is_err());
    }

    #[test]
    fn annual_classification() {
        assert!(Characteristic::Me.is_annual());
        assert!(Characteristic::Bm.is_annual());
        assert!(!Characteristic::MOMENTUM.is_annual());
    }

    #[test]
    fn column_names_are_lowercase() {
        assert_eq!(Characteristic::Bm.column(), "bm");
        assert_eq!(Characteristic::MOMENTUM.column(), "prior_2_12");
    }
}
