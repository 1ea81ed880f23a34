use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::{ColumnPair, ReconMode, ReconRequest, Side};
use crate::universe::UnionOrder;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// A reconciliation job, usually read from a TOML file:
///
/// ```toml
/// name = "Inventory vs. ledger"
/// mode = "delta"
///
/// [sources.a]
/// file = "inventory.csv"
/// key = "sku"
///
/// [sources.b]
/// file = "ledger.xlsx"
/// key = "item_id"
///
/// [[mapping]]
/// a = "qty"
/// b = "quantity"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mode: ReconMode,
    #[serde(default)]
    pub order: UnionOrder,
    pub sources: Sources,
    #[serde(default)]
    pub mapping: Vec<ColumnPair>,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Sources {
    pub a: SourceConfig,
    pub b: SourceConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub file: PathBuf,
    /// Primary key column of this source.
    pub key: String,
}

impl Sources {
    pub fn get(&self, side: Side) -> &SourceConfig {
        match side {
            Side::A => &self.a,
            Side::B => &self.b,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Aligned preview on stdout.
    #[default]
    Table,
    Json,
    Csv,
    Xlsx,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Xlsx => "xlsx",
        }
    }

    /// Guess a format from an output path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            "xlsx" => Some(Self::Xlsx),
            _ => None,
        }
    }

    /// Formats that can only be written to a file.
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::Xlsx)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: Option<OutputFormat>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Preview row count; falls back to the user setting.
    #[serde(default)]
    pub preview: Option<usize>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    /// Job assembled from command-line flags rather than a file.
    pub fn from_parts(
        a: impl Into<PathBuf>,
        b: impl Into<PathBuf>,
        key_a: impl Into<String>,
        key_b: impl Into<String>,
        mapping: Vec<ColumnPair>,
    ) -> Self {
        Self {
            name: None,
            mode: ReconMode::default(),
            order: UnionOrder::default(),
            sources: Sources {
                a: SourceConfig {
                    file: a.into(),
                    key: key_a.into(),
                },
                b: SourceConfig {
                    file: b.into(),
                    key: key_b.into(),
                },
            },
            mapping,
            output: OutputConfig::default(),
        }
    }

    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Shape checks that need no data: keys set, mapping non-empty and
    /// complete, no mapping entry naming its side's primary key.
    pub fn validate(&self) -> Result<(), ReconError> {
        for side in [Side::A, Side::B] {
            if self.sources.get(side).key.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "file {side}: primary key column is required"
                )));
            }
        }

        if self.mapping.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one column mapping is required".into(),
            ));
        }

        for (i, pair) in self.mapping.iter().enumerate() {
            if !pair.is_complete() {
                return Err(ReconError::ConfigValidation(format!(
                    "mapping entry {} is incomplete: both columns are required",
                    i + 1
                )));
            }
            if pair.a == self.sources.a.key {
                return Err(ReconError::MappedPrimaryKey {
                    side: Side::A,
                    column: pair.a.clone(),
                });
            }
            if pair.b == self.sources.b.key {
                return Err(ReconError::MappedPrimaryKey {
                    side: Side::B,
                    column: pair.b.clone(),
                });
            }
        }

        Ok(())
    }

    /// Every key and mapped column must appear in its side's headers.
    pub fn check_headers(&self, headers_a: &[String], headers_b: &[String]) -> Result<(), ReconError> {
        let a: HashSet<&str> = headers_a.iter().map(String::as_str).collect();
        let b: HashSet<&str> = headers_b.iter().map(String::as_str).collect();

        let wanted_a = std::iter::once(&self.sources.a.key).chain(self.mapping.iter().map(|p| &p.a));
        for column in wanted_a {
            if !a.contains(column.as_str()) {
                return Err(ReconError::UnknownColumn {
                    side: Side::A,
                    column: column.clone(),
                });
            }
        }

        let wanted_b = std::iter::once(&self.sources.b.key).chain(self.mapping.iter().map(|p| &p.b));
        for column in wanted_b {
            if !b.contains(column.as_str()) {
                return Err(ReconError::UnknownColumn {
                    side: Side::B,
                    column: column.clone(),
                });
            }
        }

        Ok(())
    }

    /// Resolve relative source and output paths against `base_dir`
    /// (the job file's directory).
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base_dir.join(&*p);
            }
        };
        join(&mut self.sources.a.file);
        join(&mut self.sources.b.file);
        if let Some(path) = self.output.path.as_mut() {
            join(path);
        }
    }

    pub fn to_request(&self) -> ReconRequest {
        ReconRequest {
            name: self.name.clone(),
            mode: self.mode,
            key_a: self.sources.a.key.clone(),
            key_b: self.sources.b.key.clone(),
            mapping: self.mapping.clone(),
            order: self.order,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
