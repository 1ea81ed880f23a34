// CSV/TSV import and result export

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use log::debug;
use tabdiff_recon::model::{format_number, CellValue, Dataset, Record};
use tabdiff_recon::ResultTable;

use crate::error::IoError;

pub fn import(path: &Path) -> Result<Dataset, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    import_from_string(&content, delimiter).map_err(|e| IoError::Csv {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(10)
        .collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the header line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Lines agreeing with the header width, weighted by that width
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let read_err = |source| IoError::Read {
        path: path.display().to_string(),
        source,
    };
    let mut file = std::fs::File::open(path).map_err(read_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(read_err)?;

    // Try UTF-8 first; on failure, recover the buffer from the error
    let content = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            // Fall back to Windows-1252 (common for Excel-exported CSVs)
            debug!("{}: not UTF-8, decoding as Windows-1252", path.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };

    Ok(match content.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => content,
    })
}

/// Parse delimited text whose first row is the header.
///
/// Blank lines are skipped. Empty fields become [`CellValue::Empty`], fields
/// past the header width are dropped and missing trailing fields stay absent.
pub fn import_from_string(content: &str, delimiter: u8) -> Result<Dataset, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = reader.records();
    let headers = match rows.next() {
        Some(header) => unique_headers(header?.iter().map(str::to_string)),
        None => return Ok(Dataset::default()),
    };

    let mut records = Vec::new();
    for result in rows {
        let row = result?;
        let mut record = Record::new();
        for (column, field) in headers.iter().zip(row.iter()) {
            if field.is_empty() {
                record.insert(column.as_str(), CellValue::Empty);
            } else {
                record.insert(column.as_str(), field);
            }
        }
        records.push(record);
    }

    debug!("parsed {} CSV records under {} headers", records.len(), headers.len());
    Ok(Dataset::new(headers, records))
}

/// Rename repeated header names to `name_1`, `name_2`, … so no column is lost.
pub(crate) fn unique_headers(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let names: Vec<String> = names.into_iter().collect();
    let mut taken: HashMap<String, usize> = HashMap::new();
    for name in &names {
        taken.entry(name.clone()).or_insert(0);
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut out = Vec::with_capacity(names.len());
    for name in &names {
        let count = seen.entry(name.as_str()).or_insert(0);
        if *count == 0 {
            *count = 1;
            out.push(name.clone());
            continue;
        }
        let mut candidate = format!("{name}_{count}");
        while taken.contains_key(&candidate) {
            *count += 1;
            candidate = format!("{name}_{count}");
        }
        *count += 1;
        taken.insert(candidate.clone(), 0);
        out.push(candidate);
    }
    out
}

/// Text of one exported cell.
pub(crate) fn cell_text(value: &CellValue) -> String {
    match value {
        CellValue::Empty => String::new(),
        CellValue::Text(s) => s.clone(),
        CellValue::Number(n) => format_number(*n),
    }
}

/// Result table as comma-separated bytes, header first.
pub fn to_bytes(table: &ResultTable) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(cell_text))?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}

pub fn export(table: &ResultTable, path: &Path) -> Result<(), IoError> {
    let write_err = |message: String| IoError::Write {
        path: path.display().to_string(),
        message,
    };
    let bytes = to_bytes(table).map_err(|e| write_err(e.to_string()))?;
    std::fs::write(path, bytes).map_err(|e| write_err(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "Name;Age;City\nAlice;30;Paris\nBob;25;London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "Name,Age,City\nAlice,30,Paris\nBob,25,London\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "Name\tAge\tCity\nAlice\t30\tParis\nBob\t25\tLondon\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_pipe_delimiter() {
        let content = "Name|Age|City\nAlice|30|Paris\nBob|25|London\n";
        assert_eq!(sniff_delimiter(content), b'|');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "Name;Address;City\n\"Doe, Jane\";\"123 Main St, Apt 4\";Paris\nBob;\"456 Elm\";London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_single_column_defaults_to_comma() {
        assert_eq!(sniff_delimiter("id\n1\n2\n"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn test_parse_header_and_fields() {
        let data = import_from_string("id,name,qty\n1,Ann,3\n2,,\n", b',').unwrap();
        assert_eq!(data.headers, vec!["id", "name", "qty"]);
        assert_eq!(data.len(), 2);
        assert_eq!(data.records[0].get("name"), Some(&CellValue::from("Ann")));
        assert_eq!(data.records[1].get("name"), Some(&CellValue::Empty));
        assert_eq!(data.records[1].get("qty"), Some(&CellValue::Empty));
    }

    #[test]
    fn test_parse_skips_blank_lines_and_ragged_rows() {
        let data = import_from_string("id,a,b\n\n1,x\n2,y,z,extra\n\n", b',').unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.records[0].get("b"), None);
        assert_eq!(data.records[1].get("b"), Some(&CellValue::from("z")));
        assert_eq!(data.records[1].len(), 3);
    }

    #[test]
    fn test_parse_empty_input() {
        let data = import_from_string("", b',').unwrap();
        assert!(data.is_empty());
        assert!(data.headers.is_empty());
    }

    #[test]
    fn test_duplicate_headers_renamed() {
        let names = ["id", "v", "v", "v_1", "v"].iter().map(|s| s.to_string());
        assert_eq!(unique_headers(names), vec!["id", "v", "v_2", "v_1", "v_3"]);
    }

    #[test]
    fn test_semicolon_csv_import() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.csv");
        fs::write(&path, "Name;Age;City\nAlice;30;Paris\nBob;25;London\n").unwrap();

        let data = import(&path).unwrap();
        assert_eq!(data.headers, vec!["Name", "Age", "City"]);
        assert_eq!(data.records[1].get("City"), Some(&CellValue::from("London")));
    }

    #[test]
    fn test_windows_1252_and_bom() {
        let dir = tempdir().unwrap();
        let latin = dir.path().join("latin.csv");
        // "café" with 0xE9 for é
        fs::write(&latin, b"id,name\n1,caf\xe9\n").unwrap();
        let data = import(&latin).unwrap();
        assert_eq!(data.records[0].get("name"), Some(&CellValue::from("café")));

        let bom = dir.path().join("bom.csv");
        fs::write(&bom, "\u{feff}id,name\n1,x\n").unwrap();
        let data = import(&bom).unwrap();
        assert_eq!(data.headers[0], "id");
    }

    #[test]
    fn test_export_writes_header_and_numbers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let table = ResultTable {
            headers: vec!["key".into(), "qty_diff".into()],
            rows: vec![
                vec![CellValue::from("a,b"), CellValue::Number(3.0)],
                vec![CellValue::from("c"), CellValue::Number(-0.5)],
            ],
        };
        export(&table, &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "key,qty_diff\n\"a,b\",3\nc,-0.5\n");
    }
}
