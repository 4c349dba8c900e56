//! Persistence layer for Clearfile
//!
//! This crate owns every SQL statement in the workspace. The extraction engine,
//! the indexer and the CLI all go through [`Database`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use clearfile_db::{Database, FileQuery};
//!
//! let db = Database::open("~/.clearfile/clearfile.sqlite3").await?;
//! let page = db.list_files(&FileQuery::page(0, 500)).await?;
//! let patterns = db.list_patterns().await?;
//! ```

mod error;
mod schema;
mod types;

// Method implementations organized by table
mod change_requests;
mod extracted;
mod files;
mod patterns;

pub use error::{DbError, Result};
pub use types::*;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Handle to the Clearfile database.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create a database at the given path.
    ///
    /// Creates all tables if they don't exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;

        info!(path = %path.display(), "Database opened");

        Ok(db)
    }

    /// Open an existing database (fails if not exists).
    pub async fn open_existing(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DbError::NotFound(format!(
                "Database not found: {}",
                path.display()
            )));
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Close the database connection.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

// Timestamp utilities
impl Database {
    /// Current time as milliseconds since Unix epoch.
    pub fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    /// Convert milliseconds to DateTime.
    pub fn millis_to_datetime(millis: i64) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp_millis(millis).unwrap_or_else(chrono::Utc::now)
    }
}

/// Values bound per `IN (...)` query. SQLite rejects statements with more
/// than 32766 variables, so id and path sets are queried in chunks.
pub(crate) const IN_CLAUSE_CHUNK: usize = 1000;

/// `?, ?, ?` for an IN clause of `n` values.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

pub(crate) fn parse_values(raw: &str) -> Result<ExtractedValues> {
    if raw.trim().is_empty() {
        return Ok(ExtractedValues::new());
    }
    Ok(serde_json::from_str(raw)?)
}

pub(crate) fn get_millis(row: &sqlx::sqlite::SqliteRow, column: &str) -> chrono::DateTime<chrono::Utc> {
    Database::millis_to_datetime(row.get::<i64, _>(column))
}
