//! Factor registry.
//!
//! Central catalog of the factors the library can construct, with their
//! construction metadata: the second sorting characteristic of the 2x3
//! sort, the long leg, and the formation cadence.

use crate::error::{FactorError, Result};
use crate::long_short::SizeLeg;
use hanover_panel::Characteristic;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A constructible factor series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactorName {
    /// Market return in excess of the risk-free rate
    MktRf,
    /// Small minus big (size)
    Smb,
    /// High minus low (value)
    Hml,
    /// Robust minus weak (profitability)
    Rmw,
    /// Conservative minus aggressive (investment)
    Cma,
    /// Momentum, prior (2-12) returns
    Mom,
    /// Short-term reversal, prior (1-1) returns
    StRev,
    /// Long-term reversal, prior (13-60) returns
    LtRev,
}

impl FactorName {
    /// All factors in canonical order.
    pub const ALL: [Self; 8] = [
        Self::MktRf,
        Self::Smb,
        Self::Hml,
        Self::Rmw,
        Self::Cma,
        Self::Mom,
        Self::StRev,
        Self::LtRev,
    ];

    /// Published label.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::MktRf => "MKT-RF",
            Self::Smb => "SMB",
            Self::Hml => "HML",
            Self::Rmw => "RMW",
            Self::Cma => "CMA",
            Self::Mom => "MOM",
            Self::StRev => "ST_Rev",
            Self::LtRev => "LT_Rev",
        }
    }

    /// Parse a published label.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MKT-RF" | "MKTRF" | "MKT" => Ok(Self::MktRf),
            "SMB" => Ok(Self::Smb),
            "HML" => Ok(Self::Hml),
            "RMW" => Ok(Self::Rmw),
            "CMA" => Ok(Self::Cma),
            "MOM" | "UMD" => Ok(Self::Mom),
            "ST_REV" => Ok(Self::StRev),
            "LT_REV" => Ok(Self::LtRev),
            other => Err(FactorError::UnknownFactor(other.to_string())),
        }
    }

    /// The second characteristic of the factor's 2x3 sort, if the factor is
    /// sort-based.
    pub const fn sort_characteristic(&self) -> Option<Characteristic> {
        match self {
            Self::MktRf => None,
            Self::Smb | Self::Hml => Some(Characteristic::Bm),
            Self::Rmw => Some(Characteristic::Op),
            Self::Cma => Some(Characteristic::Inv),
            Self::Mom => Some(Characteristic::MOMENTUM),
            Self::StRev => Some(Characteristic::SHORT_TERM_REVERSAL),
            Self::LtRev => Some(Characteristic::LONG_TERM_REVERSAL),
        }
    }

    /// Which tercile of the 2x3 sort the factor goes long.
    pub const fn long_leg(&self) -> Option<SizeLeg> {
        match self {
            Self::MktRf | Self::Smb => None,
            Self::Hml | Self::Rmw | Self::Mom => Some(SizeLeg::High),
            Self::Cma | Self::StRev | Self::LtRev => Some(SizeLeg::Low),
        }
    }

    /// Whether the factor's sort re-forms every period rather than each
    /// June.
    pub const fn intra_period_formation(&self) -> bool {
        matches!(self, Self::Mom | Self::StRev | Self::LtRev)
    }
}

impl fmt::Display for FactorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Factor metadata for listings and help output.
#[derive(Debug, Clone)]
pub struct FactorInfo {
    /// The factor
    pub name: FactorName,
    /// Brief description of the construction
    pub description: &'static str,
}

/// Get all available factor info.
pub fn available_factors() -> Vec<FactorInfo> {
    FactorName::ALL.iter().map(|&name| factor_info(name)).collect()
}

/// Metadata for a single factor.
pub fn factor_info(name: FactorName) -> FactorInfo {
    let description = match name {
        FactorName::MktRf => "Value-weighted market return minus the risk-free rate",
        FactorName::Smb => "Average small-cap portfolio return minus big-cap, from 2x3 sorts",
        FactorName::Hml => "High book-to-market minus low, size-balanced 2x3 sort",
        FactorName::Rmw => "Robust operating profitability minus weak, size-balanced 2x3 sort",
        FactorName::Cma => "Conservative (low) investment minus aggressive, size-balanced 2x3 sort",
        FactorName::Mom => "High prior (2-12) return minus low, re-formed every period",
        FactorName::StRev => "Low prior (1-1) return minus high, re-formed every period",
        FactorName::LtRev => "Low prior (13-60) return minus high, re-formed every period",
    };
    FactorInfo { name, description }
}
