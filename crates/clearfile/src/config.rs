//! Configuration for Clearfile

use crate::rename::MISSING_PLACEHOLDER;
use clearfile_logging::clearfile_home;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration, read from `~/.clearfile/config.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearfileConfig {
    /// Path to the SQLite database
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Files loaded per page during reapplication
    #[serde(default = "default_page_size")]
    pub page_size: u64,

    /// Marker substituted for missing keys by the lenient renderer
    #[serde(default = "default_missing_placeholder")]
    pub missing_placeholder: String,

    /// Files inserted per batch while indexing a directory
    #[serde(default = "default_index_batch_size")]
    pub index_batch_size: usize,
}

fn default_database_path() -> String {
    clearfile_home()
        .join("clearfile.sqlite3")
        .to_string_lossy()
        .to_string()
}

fn default_page_size() -> u64 {
    500
}

fn default_missing_placeholder() -> String {
    MISSING_PLACEHOLDER.to_string()
}

fn default_index_batch_size() -> usize {
    500
}

impl Default for ClearfileConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            page_size: default_page_size(),
            missing_placeholder: default_missing_placeholder(),
            index_batch_size: default_index_batch_size(),
        }
    }
}

impl ClearfileConfig {
    /// Default config file location
    pub fn default_path() -> PathBuf {
        clearfile_home().join("config.toml")
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ClearfileConfig =
            toml::from_str(&content).map_err(|e| crate::ClearfileError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::ClearfileError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> crate::Result<()> {
        if self.page_size == 0 {
            return Err(crate::ClearfileError::Config(
                "page_size must be greater than zero".to_string(),
            ));
        }
        if self.index_batch_size == 0 {
            return Err(crate::ClearfileError::Config(
                "index_batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
