use crate::output::traits::{
    active_columns, cell_text, map_headers, record_from_row, ExportError, ExportResult,
    TableFormat,
};
use crate::site::Column;
use crate::storage::Record;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// UTF-8 with a byte-order mark, so spreadsheet programs keep diacritics
const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Comma-separated output
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvTable;

impl TableFormat for CsvTable {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn write(&self, path: &Path, records: &[Record], columns: &[Column]) -> ExportResult<()> {
        if records.is_empty() {
            return Err(ExportError::Empty);
        }

        let columns = active_columns(records, columns);
        let mut file = File::create(path)?;
        file.write_all(BOM)?;

        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(columns.iter().map(|c| c.header))?;
        for record in records {
            writer.write_record(columns.iter().map(|c| cell_text(record, c)))?;
        }
        writer.flush()?;
        Ok(())
    }

    fn read(&self, path: &Path, columns: &[Column]) -> ExportResult<Vec<Record>> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let mapping = map_headers(reader.headers()?.iter(), columns);

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            records.push(record_from_row(&mapping, row.iter()));
        }
        Ok(records)
    }
}
