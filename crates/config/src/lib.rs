// Configuration loading

pub mod error;
pub mod mapping;
pub mod settings;

use std::path::PathBuf;

pub use error::ConfigError;
pub use mapping::{filter_columns, MappingStore, SavedMapping};
pub use settings::Settings;

/// Environment variable overriding the configuration directory.
pub const CONFIG_DIR_ENV: &str = "TABDIFF_CONFIG_DIR";

/// `$TABDIFF_CONFIG_DIR` when set and non-empty, else `<config dir>/tabdiff`.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .map(|d| d.join("tabdiff"))
        .ok_or(ConfigError::NoConfigDir)
}
