use thiserror::Error;

use crate::model::Side;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty key, empty mapping, incomplete entry).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// A mapping entry that is neither `A=B` nor a column name.
    #[error("invalid column pair {0:?}: expected A=B or a column name")]
    InvalidColumnPair(String),
    /// A key or mapped column is missing from its side's headers.
    #[error("file {side}: unknown column '{column}'")]
    UnknownColumn { side: Side, column: String },
    /// A mapping entry names the side's primary key column.
    #[error("file {side}: primary key column '{column}' cannot be mapped")]
    MappedPrimaryKey { side: Side, column: String },
    /// The run was cancelled before it completed.
    #[error("reconciliation aborted after {processed} of {total} keys")]
    Aborted { processed: usize, total: usize },
}
