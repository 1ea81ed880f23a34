//! `tabdiff-recon`: two-dataset reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded records and a column mapping,
//! returns field-level diffs or numeric deltas. No CLI or IO dependencies.

pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod model;
pub mod progress;
pub mod table;
pub mod universe;

pub use config::{OutputFormat, ReconConfig};
pub use engine::{numeric_delta, run, structural_diff, subtract_column};
pub use error::ReconError;
pub use model::{
    CellValue, ColumnPair, Dataset, DeltaRow, DiffRow, Key, Outcome, ReconMode, ReconOutput,
    ReconReport, ReconRequest, ReconSummary, Record, Side, SubtractTable,
};
pub use progress::{CancelToken, RunHooks};
pub use table::ResultTable;
pub use universe::UnionOrder;
