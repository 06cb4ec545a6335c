//! Read-only query layer over the remote research-data warehouse.
//!
//! The warehouse serves the raw security-level panels the pipeline is built
//! from: the security master (prices, shares, returns), delisting events,
//! annual fundamentals, the identifier link table, and the risk-free series.
//! Connection internals (session lifecycle, credential storage, raw SQL) are
//! the warehouse operator's concern; this layer only describes queries and
//! decodes their results.

mod client;
mod config;

pub use client::WarehouseClient;
pub use config::WarehouseConfig;

use crate::error::{DataError, Result};
use crate::frequency::Frequency;
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Inclusive date range of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First date included
    pub start: NaiveDate,
    /// Last date included
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DataError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }
}

/// A parameterized request against one warehouse table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableQuery {
    /// Security master: identifiers, codes, prices, shares, returns.
    ///
    /// Served at daily or monthly frequency; other frequencies are derived
    /// locally by compounding.
    SecurityMaster {
        /// Query window
        range: DateRange,
        /// Native panel frequency (`Daily` or `Monthly`)
        frequency: Frequency,
    },
    /// Delisting events: delisting date, return, and code per security.
    Delistings {
        /// Query window
        range: DateRange,
    },
    /// Annual fundamentals per accounting identifier.
    Fundamentals {
        /// Query window (by report date)
        range: DateRange,
    },
    /// Security-to-fundamentals identifier links with validity windows.
    LinkTable,
    /// One-period risk-free rate series.
    RiskFree {
        /// Query window
        range: DateRange,
        /// Native series frequency (`Daily` or `Monthly`)
        frequency: Frequency,
    },
}

impl TableQuery {
    /// Warehouse table name.
    pub const fn table(&self) -> &'static str {
        match self {
            Self::SecurityMaster { .. } => "security_master",
            Self::Delistings { .. } => "delistings",
            Self::Fundamentals { .. } => "fundamentals",
            Self::LinkTable => "link_table",
            Self::RiskFree { .. } => "risk_free",
        }
    }

    /// Columns requested from the table.
    pub const fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::SecurityMaster { .. } => &[
                "permno", "date", "ret", "retx", "prc", "shrout", "cfacshr", "exchcd", "shrcd",
            ],
            Self::Delistings { .. } => &["permno", "date", "dlret", "dlstcd"],
            Self::Fundamentals { .. } => &[
                "gvkey", "datadate", "fyear", "at", "lt", "seq", "ceq", "pstk", "pstkrv", "pstkl",
                "txditc", "revt", "cogs", "xsga", "xint", "ib", "act", "che", "lct", "dlc", "txp",
            ],
            Self::LinkTable => &["gvkey", "permno", "linkprim", "linkdt", "linkenddt"],
            Self::RiskFree { .. } => &["date", "rf"],
        }
    }

    /// Stable key identifying this query in the cache.
    pub fn cache_key(&self) -> String {
        match self {
            Self::SecurityMaster { range, frequency } => format!(
                "security_master/{}/{}/{}",
                frequency.code(),
                range.start,
                range.end
            ),
            Self::Delistings { range } => format!("delistings/{}/{}", range.start, range.end),
            Self::Fundamentals { range } => format!("fundamentals/{}/{}", range.start, range.end),
            Self::LinkTable => "link_table".to_string(),
            Self::RiskFree { range, frequency } => {
                format!("risk_free/{}/{}/{}", frequency.code(), range.start, range.end)
            }
        }
    }

    /// Query window, if the table is windowed.
    pub const fn range(&self) -> Option<&DateRange> {
        match self {
            Self::SecurityMaster { range, .. }
            | Self::Delistings { range }
            | Self::Fundamentals { range }
            | Self::RiskFree { range, .. } => Some(range),
            Self::LinkTable => None,
        }
    }
}

/// A source of raw warehouse panels.
///
/// `WarehouseClient` implements this over HTTPS; tests implement it over
/// in-memory frames.
#[allow(async_fn_in_trait)]
pub trait Warehouse {
    /// Execute a table query and return the raw panel.
    async fn fetch(&self, query: &TableQuery) -> Result<DataFrame>;
}
