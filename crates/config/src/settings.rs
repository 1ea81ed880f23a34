// User settings
// Loaded from <config dir>/settings.json

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default per-file size limit (10 MiB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Preview
    #[serde(rename = "preview.rows")]
    pub preview_rows: usize,

    // File
    #[serde(rename = "file.maxBytes")]
    pub max_file_bytes: u64,

    // UI
    #[serde(rename = "ui.progress")]
    pub progress: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preview_rows: 20,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            progress: true,
        }
    }
}

const DEFAULT_FILE: &str = r#"{
    // Rows shown by the table preview
    "preview.rows": 20,

    // Largest accepted input file, in bytes
    "file.maxBytes": 10485760,

    // Progress bar on stderr when it is a terminal
    "ui.progress": true
}
"#;

impl Settings {
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join("settings.json")
    }

    /// Load settings from `dir`, falling back to defaults.
    ///
    /// A missing file is created with commented defaults; an unreadable one
    /// is reported and ignored.
    pub fn load_from(dir: &Path) -> Self {
        let path = Self::path_in(dir);

        if !path.exists() {
            if let Err(e) = Self::create_default_file(&path) {
                warn!("{}", e);
            }
            return Self::default();
        }

        match Self::read(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("{}; using default settings", e);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        // Strip comments (lines starting with //)
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        serde_json::from_str(&cleaned).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save current settings to `dir`
    #[cfg(test)]
    pub fn save_to(&self, dir: &Path) -> Result<(), ConfigError> {
        let path = Self::path_in(dir);
        let io_err = |source| ConfigError::Io {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(dir).map_err(io_err)?;
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(io_err)
    }

    fn create_default_file(path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, DEFAULT_FILE).map_err(io_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load_from(dir.path());
        assert_eq!(settings, Settings::default());

        let path = Settings::path_in(dir.path());
        assert!(path.exists());
        // The commented template parses back to the same defaults
        assert_eq!(Settings::load_from(dir.path()), Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        fs::write(Settings::path_in(dir.path()), r#"{ "preview.rows": 5 }"#).unwrap();
        let settings = Settings::load_from(dir.path());
        assert_eq!(settings.preview_rows, 5);
        assert_eq!(settings.max_file_bytes, DEFAULT_MAX_FILE_BYTES);
        assert!(settings.progress);
    }

    #[test]
    fn invalid_file_falls_back() {
        let dir = tempdir().unwrap();
        fs::write(Settings::path_in(dir.path()), "{ not json").unwrap();
        assert_eq!(Settings::load_from(dir.path()), Settings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        let settings = Settings {
            preview_rows: 3,
            max_file_bytes: 1024,
            progress: false,
        };
        settings.save_to(&nested).unwrap();
        assert_eq!(Settings::load_from(&nested), settings);
    }
}
