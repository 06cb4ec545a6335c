//! Export of constructed tables to CSV and JSON.

use polars::prelude::*;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Encoding error.
    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,
    /// Compact JSON format.
    Json,
    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

/// Render a frame as CSV text: header row, dates in ISO form, empty cells
/// for missing values.
pub fn frame_to_csv(frame: &DataFrame) -> Result<String, ExportError> {
    let mut text_columns: Vec<Vec<Option<String>>> = Vec::with_capacity(frame.width());
    let mut header: Vec<String> = Vec::with_capacity(frame.width());
    for column in frame.get_columns() {
        header.push(column.name().to_string());
        let texts = column
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect();
        text_columns.push(texts);
    }

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(&header)?;
    for row in 0..frame.height() {
        let record: Vec<&str> = text_columns
            .iter()
            .map(|column| column[row].as_deref().unwrap_or(""))
            .collect();
        wtr.write_record(&record)?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| ExportError::Encoding(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Encoding(e.to_string()))
}

/// Write a frame to a CSV file.
pub fn write_frame_csv<P: AsRef<Path>>(frame: &DataFrame, path: P) -> Result<(), ExportError> {
    let content = frame_to_csv(frame)?;
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Serialize any serializable report to JSON text.
pub fn to_json<T: serde::Serialize>(
    value: &T,
    format: ExportFormat,
) -> Result<String, ExportError> {
    match format {
        ExportFormat::Json => Ok(serde_json::to_string(value)?),
        ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(value)?),
        ExportFormat::Csv => Err(ExportError::Encoding(
            "CSV export requires a tabular value".to_string(),
        )),
    }
}
