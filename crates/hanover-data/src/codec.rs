//! Column-oriented JSON codec for panel frames.
//!
//! The warehouse speaks this format on the wire and the SQLite cache stores
//! it as its payload, so a query result round-trips through one codec.

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// A single column of a serialized frame.
///
/// Dates travel as ISO `YYYY-MM-DD` strings and are revived into the Date
/// dtype when the frame is rebuilt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "dtype", rename_all = "lowercase")]
pub enum FrameColumn {
    /// 64-bit float column
    Float {
        /// Column name
        name: String,
        /// Column values
        values: Vec<Option<f64>>,
    },
    /// 64-bit integer column
    Int {
        /// Column name
        name: String,
        /// Column values
        values: Vec<Option<i64>>,
    },
    /// UTF-8 string column
    Str {
        /// Column name
        name: String,
        /// Column values
        values: Vec<Option<String>>,
    },
    /// Calendar date column, ISO-formatted
    Date {
        /// Column name
        name: String,
        /// Column values as `YYYY-MM-DD`
        values: Vec<Option<String>>,
    },
}

impl FrameColumn {
    /// Column name.
    pub fn name(&self) -> &str {
        match self {
            Self::Float { name, .. }
            | Self::Int { name, .. }
            | Self::Str { name, .. }
            | Self::Date { name, .. } => name,
        }
    }
}

/// A serialized frame: an ordered list of columns of equal length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramePayload {
    /// Frame columns in order
    pub columns: Vec<FrameColumn>,
}

impl FramePayload {
    /// Rebuild a `DataFrame` from the payload.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut cols: Vec<Column> = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            match column {
                FrameColumn::Float { name, values } => {
                    cols.push(Column::new(name.as_str().into(), values.clone()));
                }
                FrameColumn::Int { name, values } => {
                    cols.push(Column::new(name.as_str().into(), values.clone()));
                }
                FrameColumn::Str { name, values } => {
                    cols.push(Column::new(name.as_str().into(), values.clone()));
                }
                FrameColumn::Date { name, values } => {
                    let dates = values
                        .iter()
                        .map(|v| {
                            v.as_deref()
                                .map(|s| {
                                    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
                                        DataError::Parse(format!("bad date {s}: {e}"))
                                    })
                                })
                                .transpose()
                        })
                        .collect::<Result<Vec<Option<NaiveDate>>>>()?;
                    cols.push(Column::new(name.as_str().into(), dates));
                }
            }
        }
        Ok(DataFrame::new(cols)?)
    }

    /// Serialize a `DataFrame` into the payload form.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let mut columns = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let name = column.name().to_string();
            match column.dtype() {
                DataType::Float64 => {
                    let values = column.f64()?.into_iter().collect();
                    columns.push(FrameColumn::Float { name, values });
                }
                DataType::Float32 => {
                    let cast = column.cast(&DataType::Float64)?;
                    let values = cast.f64()?.into_iter().collect();
                    columns.push(FrameColumn::Float { name, values });
                }
                DataType::Int64 | DataType::Int32 | DataType::UInt32 | DataType::UInt64 => {
                    let cast = column.cast(&DataType::Int64)?;
                    let values = cast.i64()?.into_iter().collect();
                    columns.push(FrameColumn::Int { name, values });
                }
                DataType::String => {
                    let values = column
                        .str()?
                        .into_iter()
                        .map(|v| v.map(str::to_string))
                        .collect();
                    columns.push(FrameColumn::Str { name, values });
                }
                DataType::Date => {
                    let cast = column.cast(&DataType::String)?;
                    let values = cast
                        .str()?
                        .into_iter()
                        .map(|v| v.map(str::to_string))
                        .collect();
                    columns.push(FrameColumn::Date { name, values });
                }
                other => {
                    return Err(DataError::Parse(format!(
                        "unsupported dtype {other} in column {name}"
                    )));
                }
            }
        }
        Ok(Self { columns })
    }
}
