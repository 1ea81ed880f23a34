// JSON report export

use std::path::Path;

use serde::Serialize;
use tabdiff_recon::ReconReport;

use crate::error::IoError;

/// Version of the JSON report layout. Bump on breaking field changes.
pub const CONTRACT_VERSION: u32 = 1;

#[derive(Serialize)]
struct Envelope<'a> {
    contract_version: u32,
    #[serde(flatten)]
    report: &'a ReconReport,
}

/// Full report as pretty JSON bytes with a trailing newline.
pub fn to_bytes(report: &ReconReport) -> Result<Vec<u8>, serde_json::Error> {
    let top = Envelope {
        contract_version: CONTRACT_VERSION,
        report,
    };
    let mut bytes = serde_json::to_vec_pretty(&top)?;
    bytes.push(b'\n');
    Ok(bytes)
}

pub fn export(report: &ReconReport, path: &Path) -> Result<(), IoError> {
    let write_err = |message: String| IoError::Write {
        path: path.display().to_string(),
        message,
    };
    let bytes = to_bytes(report).map_err(|e| write_err(e.to_string()))?;
    std::fs::write(path, bytes).map_err(|e| write_err(e.to_string()))
}
