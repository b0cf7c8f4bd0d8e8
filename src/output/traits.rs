//! Tabular format trait, export errors and the column mapping shared by
//! every format

use crate::site::Column;
use crate::storage::{FieldValue, Record};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while writing or reading output files
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Workbook read error: {0}")]
    Workbook(String),

    #[error("No records to write")]
    Empty,
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;

/// A flat, one-row-per-record file format
pub trait TableFormat {
    /// Short name used in log lines
    fn name(&self) -> &'static str;

    /// Writes `records` under the header row of `columns`, replacing the file
    ///
    /// # Returns
    ///
    /// * `Ok(())` - File written
    /// * `Err(ExportError::Empty)` - Nothing to write; the file is untouched
    fn write(&self, path: &Path, records: &[Record], columns: &[Column]) -> ExportResult<()>;

    /// Reads records back, mapping headers to keys through `columns`
    ///
    /// Headers unknown to the layout are ignored.
    fn read(&self, path: &Path, columns: &[Column]) -> ExportResult<Vec<Record>>;
}

/// The layout columns that at least one record carries, in layout order
pub fn active_columns(records: &[Record], columns: &[Column]) -> Vec<Column> {
    columns
        .iter()
        .filter(|c| records.iter().any(|r| r.has_key(c.key)))
        .copied()
        .collect()
}

/// Cell text for one record and column; missing values get the absent label
pub fn cell_text<'a>(record: &'a Record, column: &'a Column) -> &'a str {
    record.get(column.key).or_label(column.absent)
}

/// Inverse of `cell_text`: the absent label reads back as missing
pub fn parse_cell(column: &Column, text: &str) -> FieldValue {
    if text == column.absent {
        FieldValue::Missing
    } else {
        FieldValue::Value(text.to_string())
    }
}

/// Builds a record from one row, given the column each position maps to
pub fn record_from_row<'a, I>(mapping: &[Option<&Column>], cells: I) -> Record
where
    I: IntoIterator<Item = &'a str>,
{
    let mut record = Record::new();
    for (column, text) in mapping.iter().zip(cells) {
        if let Some(column) = column {
            record.set(column.key, parse_cell(column, text));
        }
    }
    record
}

/// Maps header cells to layout columns
pub fn map_headers<'c, 'h>(
    headers: impl IntoIterator<Item = &'h str>,
    columns: &'c [Column],
) -> Vec<Option<&'c Column>> {
    headers
        .into_iter()
        .map(|h| {
            let h = h.trim_start_matches('\u{feff}').trim();
            columns.iter().find(|c| c.header == h)
        })
        .collect()
}
