use crate::output::traits::{
    active_columns, cell_text, map_headers, record_from_row, ExportError, ExportResult,
    TableFormat,
};
use crate::site::Column;
use crate::storage::Record;
use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;

const SHEET_NAME: &str = "Listings";

/// Spreadsheet output, one worksheet
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxTable;

impl TableFormat for XlsxTable {
    fn name(&self) -> &'static str {
        "xlsx"
    }

    fn write(&self, path: &Path, records: &[Record], columns: &[Column]) -> ExportResult<()> {
        if records.is_empty() {
            return Err(ExportError::Empty);
        }

        let columns = active_columns(records, columns);
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();

        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        for (col, column) in columns.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, column.header, &header_format)?;
        }

        for (row, record) in records.iter().enumerate() {
            for (col, column) in columns.iter().enumerate() {
                sheet.write_string(row as u32 + 1, col as u16, cell_text(record, column))?;
            }
        }
        sheet.autofit();

        workbook.save(path)?;
        Ok(())
    }

    fn read(&self, path: &Path, columns: &[Column]) -> ExportResult<Vec<Record>> {
        let mut workbook =
            open_workbook_auto(path).map_err(|e| ExportError::Workbook(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ExportError::Workbook("workbook has no sheets".to_string()))?
            .map_err(|e| ExportError::Workbook(e.to_string()))?;

        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            return Ok(Vec::new());
        };

        let headers: Vec<String> = header_row.iter().map(cell_string).collect();
        let mapping = map_headers(headers.iter().map(String::as_str), columns);

        let records = rows
            .map(|row| {
                let cells: Vec<String> = row.iter().map(cell_string).collect();
                record_from_row(&mapping, cells.iter().map(String::as_str))
            })
            .collect();
        Ok(records)
    }
}

fn cell_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}
