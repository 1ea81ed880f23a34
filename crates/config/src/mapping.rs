//! The last validated column mapping, remembered between runs.
//!
//! Stored as `mapping.json` in the configuration directory. The engine never
//! reads it; the CLI falls back to it when no mapping is given.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};
use tabdiff_recon::ColumnPair;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SavedMapping {
    pub primary_key_a: String,
    pub primary_key_b: String,
    #[serde(default)]
    pub mapping: Vec<ColumnPair>,
}

impl SavedMapping {
    /// Both keys chosen and at least one mapping entry, every entry complete.
    pub fn is_ready(&self) -> bool {
        !self.primary_key_a.is_empty()
            && !self.primary_key_b.is_empty()
            && !self.mapping.is_empty()
            && self.mapping.iter().all(ColumnPair::is_complete)
    }
}

#[derive(Debug, Clone)]
pub struct MappingStore {
    path: PathBuf,
}

impl MappingStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join("mapping.json"),
        }
    }

    /// Store under [`crate::config_dir`].
    pub fn open() -> Result<Self, ConfigError> {
        crate::config_dir().map(|dir| Self::new(&dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when nothing has been saved yet.
    pub fn load(&self) -> Result<Option<SavedMapping>, ConfigError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let saved = serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(saved))
    }

    pub fn save(&self, saved: &SavedMapping) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(saved).map_err(|source| ConfigError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json).map_err(io_err)?;
        debug!("saved mapping to {}", self.path.display());
        Ok(())
    }

    /// Remove the saved mapping. Returns whether one existed.
    pub fn clear(&self) -> Result<bool, ConfigError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(ConfigError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Columns offered for mapping: every header except `exclude` (the side's
/// primary key) that contains `term`, ignoring case. An empty term matches all.
pub fn filter_columns<'a>(headers: &'a [String], exclude: Option<&str>, term: &str) -> Vec<&'a str> {
    let term = term.to_lowercase();
    headers
        .iter()
        .map(String::as_str)
        .filter(|h| Some(*h) != exclude)
        .filter(|h| h.to_lowercase().contains(&term))
        .collect()
}
