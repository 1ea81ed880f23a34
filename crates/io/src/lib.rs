// File I/O: dataset loading and result export

pub mod csv;
pub mod error;
pub mod json;
pub mod xlsx;

use std::path::Path;

use log::debug;
use tabdiff_recon::{Dataset, OutputFormat, ReconReport, ResultTable};

pub use error::IoError;

/// Input file kinds, chosen by extension (case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Result<Self, IoError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("xlsx") => Ok(Self::Xlsx),
            _ => Err(IoError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }
}

/// Reject files over `max_bytes`.
pub fn check_size(path: &Path, max_bytes: u64) -> Result<u64, IoError> {
    let size = std::fs::metadata(path)
        .map_err(|source| IoError::Read {
            path: path.display().to_string(),
            source,
        })?
        .len();
    if size > max_bytes {
        return Err(IoError::TooLarge {
            path: path.display().to_string(),
            size,
            limit: max_bytes,
        });
    }
    Ok(size)
}

/// Load a `.csv` or `.xlsx` file into a dataset after the format and size checks.
pub fn load(path: &Path, max_bytes: u64) -> Result<Dataset, IoError> {
    let format = FileFormat::from_path(path)?;
    let size = check_size(path, max_bytes)?;
    debug!("loading {} ({:?}, {} bytes)", path.display(), format, size);
    match format {
        FileFormat::Csv => csv::import(path),
        FileFormat::Xlsx => xlsx::import(path),
    }
}

/// Write a report to `path` in `format`. The table format has no file
/// form of its own and is written as CSV.
pub fn export(report: &ReconReport, format: OutputFormat, path: &Path) -> Result<(), IoError> {
    match format {
        OutputFormat::Json => json::export(report, path),
        OutputFormat::Xlsx => xlsx::export(&ResultTable::from_report(report), path),
        OutputFormat::Csv | OutputFormat::Table => csv::export(&ResultTable::from_report(report), path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_path(Path::new("a.CSV")).unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_path(Path::new("dir/b.xlsx")).unwrap(), FileFormat::Xlsx);
        assert!(matches!(
            FileFormat::from_path(Path::new("c.xls")),
            Err(IoError::UnsupportedFormat { .. })
        ));
        assert!(FileFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_load_rejects_large_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("big.csv");
        fs::write(&path, "id,v\n1,2\n").unwrap();

        let err = load(&path, 4).unwrap_err();
        assert!(matches!(err, IoError::TooLarge { size: 9, limit: 4, .. }));
        assert!(load(&path, 1024).is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = load(&dir.path().join("gone.csv"), 1024).unwrap_err();
        assert!(matches!(err, IoError::Read { .. }));
        assert!(err.to_string().contains("gone.csv"));
    }

    #[test]
    fn test_unsupported_checked_before_size() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.txt");
        fs::write(&path, "id\n1\n").unwrap();
        assert!(matches!(load(&path, 1), Err(IoError::UnsupportedFormat { .. })));
    }
}
