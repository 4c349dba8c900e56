//! CLI module for Clearfile
//!
//! Every command opens the database named by the active configuration, runs
//! one engine operation and prints the result as a table or as JSON.

pub mod error;
pub mod output;

pub mod apply;
pub mod files;
pub mod index;
pub mod pattern;
pub mod rename;

use crate::cli::error::HelpfulError;
use clearfile::ClearfileConfig;
use clearfile_db::Database;
use std::path::{Path, PathBuf};

/// Configuration and database shared by one command invocation.
pub struct CliContext {
    pub config: ClearfileConfig,
    pub db: Database,
}

impl CliContext {
    /// Load configuration (explicit path, else the default location) and open the database.
    pub async fn open(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let path: PathBuf = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(ClearfileConfig::default_path);

        let config = if config_path.is_some() {
            ClearfileConfig::load(&path).map_err(|e| {
                HelpfulError::new(format!("Failed to load config: {}", e))
                    .with_context(format!("Config path: {}", path.display()))
            })?
        } else {
            ClearfileConfig::load_or_default(&path).map_err(HelpfulError::from)?
        };

        let db_path = PathBuf::from(&config.database_path);
        let db = Database::open(&db_path)
            .await
            .map_err(|e| HelpfulError::database_unavailable(&db_path, e))?;

        Ok(Self { config, db })
    }

    pub fn reapply_config(&self) -> clearfile::ReapplyConfig {
        clearfile::ReapplyConfig {
            page_size: self.config.page_size,
        }
    }
}

/// Parse an id argument, mapping failures to a helpful error.
pub fn parse_id<T>(kind: &str, input: &str) -> Result<T, HelpfulError>
where
    T: std::str::FromStr,
{
    input.parse().map_err(|_| HelpfulError::invalid_id(kind, input))
}
