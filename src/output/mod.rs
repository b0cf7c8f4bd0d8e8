//! Output module for persisting harvested records
//!
//! This module handles:
//! - Writing the record store to CSV and XLSX with the site's column layout
//! - Reading previous output back when a run resumes
//! - Printing run summaries and saved-output statistics

mod csv_table;
pub mod stats;
mod traits;
mod xlsx_table;

pub use csv_table::CsvTable;
pub use stats::{
    load_saved_statistics, print_saved_statistics, print_summary, HarvestSummary, SavedStatistics,
};
pub use traits::{
    active_columns, cell_text, parse_cell, ExportError, ExportResult, TableFormat,
};
pub use xlsx_table::XlsxTable;

use crate::site::Column;
use crate::storage::Record;
use std::path::Path;
use tracing::{debug, warn};

/// Picks the format from the file extension; anything but xlsx/xls is CSV
pub fn format_for(path: &Path) -> Box<dyn TableFormat> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("xlsx") | Some("xls") => Box::new(XlsxTable),
        _ => Box::new(CsvTable),
    }
}

/// Writes the records to both output files
///
/// Both files are attempted even when the first one fails. An empty record
/// list leaves existing files untouched.
///
/// # Returns
///
/// * `Ok(())` - Both files written, or nothing to write
/// * `Err(ExportError)` - The first failure
pub fn persist_records(
    records: &[Record],
    columns: &[Column],
    csv_path: &Path,
    xlsx_path: &Path,
) -> ExportResult<()> {
    if records.is_empty() {
        debug!("No records to save yet");
        return Ok(());
    }

    let mut first_error = None;
    for path in [csv_path, xlsx_path] {
        let format = format_for(path);
        match format.write(path, records, columns) {
            Ok(()) => debug!("Wrote {} records to {}", records.len(), path.display()),
            Err(e) => {
                warn!("Writing {} file {} failed: {}", format.name(), path.display(), e);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Reads records from a CSV or XLSX file, chosen by extension
pub fn load_records(path: &Path, columns: &[Column]) -> ExportResult<Vec<Record>> {
    format_for(path).read(path, columns)
}
