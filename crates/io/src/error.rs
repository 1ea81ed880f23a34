use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    /// Extension other than `.csv` / `.xlsx`.
    #[error("{path}: unsupported file type (expected .csv or .xlsx)")]
    UnsupportedFormat { path: String },
    #[error("{path}: file is {size} bytes, the limit is {limit} bytes")]
    TooLarge { path: String, size: u64, limit: u64 },
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("{path}: invalid CSV: {message}")]
    Csv { path: String, message: String },
    #[error("{path}: cannot read workbook: {message}")]
    Xlsx { path: String, message: String },
    #[error("cannot write {path}: {message}")]
    Write { path: String, message: String },
}
