// Excel import (first worksheet) and result export (xlsx only)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use log::debug;
use rust_xlsxwriter::{Format, Workbook};
use tabdiff_recon::model::{format_number, CellValue, Dataset, Record};
use tabdiff_recon::ResultTable;

use crate::csv::unique_headers;
use crate::error::IoError;

/// Worksheet name used for exported results.
pub const RESULT_SHEET: &str = "Result";

/// Import the first worksheet; its first row is the header.
pub fn import(path: &Path) -> Result<Dataset, IoError> {
    let xlsx_err = |message: String| IoError::Xlsx {
        path: path.display().to_string(),
        message,
    };

    let mut workbook: Sheets<_> =
        open_workbook_auto(path).map_err(|e| xlsx_err(format!("failed to open: {}", e)))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let Some(first) = sheet_names.first() else {
        return Err(xlsx_err("workbook contains no sheets".to_string()));
    };

    let range = workbook
        .worksheet_range(first)
        .map_err(|e| xlsx_err(format!("failed to read sheet '{}': {}", first, e)))?;
    let first_col = range.start().map(|(_, col)| col as usize).unwrap_or(0);

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header) => unique_headers(header.iter().enumerate().map(|(i, cell)| {
            match convert_cell(cell) {
                Some(value) if !value.is_empty() => value.as_text().into_owned(),
                _ => col_to_letter(first_col + i),
            }
        })),
        None => return Ok(Dataset::default()),
    };

    let mut records = Vec::new();
    for row in rows {
        let mut record = Record::new();
        for (column, cell) in headers.iter().zip(row.iter()) {
            if let Some(value) = convert_cell(cell) {
                record.insert(column.as_str(), value);
            }
        }
        // Skip blank rows
        if record.is_empty() {
            continue;
        }
        records.push(record);
    }

    debug!(
        "{}: sheet '{}' gave {} records under {} headers",
        path.display(),
        first,
        records.len(),
        headers.len()
    );
    Ok(Dataset::new(headers, records))
}

/// Map one worksheet cell. Empty cells (and empty strings) are absent.
fn convert_cell(cell: &Data) -> Option<CellValue> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            if s.is_empty() {
                None
            } else {
                Some(CellValue::Text(s.clone()))
            }
        }
        Data::Float(n) => Some(CellValue::Number(*n)),
        Data::Int(n) => Some(CellValue::Number(*n as f64)),
        // TRUE/FALSE text, as a spreadsheet displays it
        Data::Bool(b) => Some(CellValue::from(if *b { "TRUE" } else { "FALSE" })),
        Data::Error(e) => Some(CellValue::Text(e.to_string())),
        // Dates keep their serial number
        Data::DateTime(dt) => Some(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) => Some(CellValue::Text(s.clone())),
        Data::DurationIso(s) => Some(CellValue::Text(s.clone())),
    }
}

/// Write the result table to a single worksheet named [`RESULT_SHEET`]
/// with a bold header row.
pub fn export(table: &ResultTable, path: &Path) -> Result<(), IoError> {
    let write_err = |message: String| IoError::Write {
        path: path.display().to_string(),
        message,
    };

    let mut workbook = Workbook::new();
    let worksheet = workbook
        .add_worksheet()
        .set_name(RESULT_SHEET)
        .map_err(|e| write_err(format!("failed to create sheet: {}", e)))?;

    let bold = Format::new().set_bold();
    for (col, header) in table.headers.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, header, &bold)
            .map_err(|e| write_err(e.to_string()))?;
    }

    for (i, row) in table.rows.iter().enumerate() {
        let row32 = (i + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            let col16 = col as u16;
            let written = match value {
                CellValue::Empty => continue,
                CellValue::Text(s) => worksheet.write_string(row32, col16, s),
                // Excel has no NaN or infinity; keep their text form
                CellValue::Number(n) if !n.is_finite() => {
                    worksheet.write_string(row32, col16, format_number(*n))
                }
                CellValue::Number(n) => worksheet.write_number(row32, col16, *n),
            };
            written.map_err(|e| write_err(e.to_string()))?;
        }
    }

    workbook
        .save(path)
        .map_err(|e| write_err(format!("failed to save XLSX file: {}", e)))
}

/// Convert column index to Excel column letter (0 = A, 25 = Z, 26 = AA, etc.)
fn col_to_letter(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}
