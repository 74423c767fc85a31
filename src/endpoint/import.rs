//! Endpoint import from spreadsheet or CSV files.
//!
//! The first row is a header and is skipped. Columns map by position to
//! name, address, scheme and port, captured as plain text.

use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader, Xlsx};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::descriptor::{DescriptorError, EndpointDescriptor};

/// MIME type of an Office Open XML spreadsheet.
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// MIME type of a CSV file.
pub const CSV_MIME: &str = "text/csv";

/// Columns read from each row.
const COLUMNS: usize = 4;

/// Supported import formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    /// Single-sheet `.xlsx` workbook.
    Xlsx,
    /// Comma separated values.
    Csv,
}

impl ImportFormat {
    /// Returns the format for a MIME type.
    #[must_use]
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or(mime).trim();
        match essence {
            XLSX_MIME => Some(Self::Xlsx),
            CSV_MIME => Some(Self::Csv),
            _ => None,
        }
    }

    /// Returns the format for a file name, by extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "xlsx" => Some(Self::Xlsx),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }
}

/// Import errors.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Neither spreadsheet nor CSV.
    #[error("File format {0} not supported.")]
    UnsupportedFormat(String),

    /// Workbooks must hold exactly one sheet.
    #[error("File must contain exactly 1 worksheet")]
    WorksheetCount(usize),

    /// Workbook could not be read.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// CSV could not be read.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One imported row, as text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportedRow {
    pub name: String,
    #[serde(rename = "ipAddress")]
    pub address: String,
    #[serde(rename = "format")]
    pub scheme: String,
    pub port: String,
}

impl ImportedRow {
    fn from_cells<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut values = cells.into_iter().map(Into::into);
        let mut next = || values.next().unwrap_or_default();
        Self {
            name: next(),
            address: next(),
            scheme: next(),
            port: next(),
        }
    }

    /// Validates the row into a descriptor.
    pub fn to_descriptor(&self) -> Result<EndpointDescriptor, DescriptorError> {
        EndpointDescriptor::from_fields(&self.name, &self.address, &self.scheme, &self.port)
    }
}

/// Parses `data` in `format`.
pub fn parse(format: ImportFormat, data: &[u8]) -> Result<Vec<ImportedRow>, ImportError> {
    match format {
        ImportFormat::Csv => parse_csv(data),
        ImportFormat::Xlsx => parse_xlsx(data),
    }
}

/// Parses CSV, skipping the header row.
pub fn parse_csv(data: &[u8]) -> Result<Vec<ImportedRow>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(ImportedRow::from_cells(
            (0..COLUMNS).map(|i| record.get(i).unwrap_or_default()),
        ));
    }
    Ok(rows)
}

/// Parses a single-sheet workbook, skipping the first row.
pub fn parse_xlsx(data: &[u8]) -> Result<Vec<ImportedRow>, ImportError> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(data)).map_err(|e| ImportError::Spreadsheet(e.to_string()))?;

    let sheet_count = workbook.sheet_names().len();
    if sheet_count != 1 {
        return Err(ImportError::WorksheetCount(sheet_count));
    }

    let range = match workbook.worksheet_range_at(0) {
        Some(Ok(range)) => range,
        Some(Err(e)) => return Err(ImportError::Spreadsheet(e.to_string())),
        None => return Err(ImportError::WorksheetCount(0)),
    };

    let Some((last_row, _)) = range.end() else {
        return Ok(Vec::new());
    };

    // Positions are absolute, so a sheet that starts below row 1 still
    // maps column A to name.
    let rows = (1..=last_row)
        .map(|row| {
            ImportedRow::from_cells((0..COLUMNS as u32).map(|col| {
                range
                    .get_value((row, col))
                    .map(cell_text)
                    .unwrap_or_default()
            }))
        })
        .collect();

    Ok(rows)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}
