//! Clearfile - Core Library
//!
//! Infers structured metadata from file paths with user-authored capture
//! patterns, keeps every indexed file's best extraction up to date, and
//! copies files under names rendered from that metadata.
//!
//! ```rust,ignore
//! use clearfile::{ClearfileConfig, PatternService, ReapplyConfig};
//! use clearfile_db::Database;
//!
//! let config = ClearfileConfig::default();
//! let db = Database::open(&config.database_path).await?;
//! let patterns = PatternService::new(db, ReapplyConfig { page_size: config.page_size });
//! patterns.create("reports", r"report_(?P<year>\d+)", Some(r#"{"y": "$year:d$"}"#)).await?;
//! ```

pub mod change;
pub mod config;
pub mod error;
pub mod extract;
pub mod fileops;
pub mod index;
pub mod patterns;
pub mod rename;

pub use change::{ChangeService, OutcomeStatus, RenameCopyReport, RenameOutcome};
pub use config::ClearfileConfig;
pub use error::{ClearfileError, Result};
pub use extract::{
    compile_patterns, select_best, CompiledPattern, ExtractionSync, Extractor, FileSelection,
    ReapplyCancelToken, ReapplyConfig, ReapplySummary, Reapplier, Selection,
};
pub use index::{IndexSummary, Indexer};
pub use patterns::{capture_variables, PatternChange, PatternService, PatternUpdate};
pub use rename::{render_filename, template_keys, MissingKeyPolicy, MISSING_PLACEHOLDER};

#[cfg(test)]
pub(crate) mod test_support {
    use clearfile_db::{Database, FileRecord, NewFile, NewPattern, Pattern};
    use std::path::Path;
    use tempfile::TempDir;

    pub async fn temp_db() -> (Database, TempDir) {
        let tmp = TempDir::new().unwrap();
        let db = Database::open(tmp.path().join("test.sqlite3")).await.unwrap();
        (db, tmp)
    }

    pub async fn add_file(db: &Database, path: &str, size: u64) -> FileRecord {
        db.insert_files(&[NewFile::from_path(Path::new(path), size)])
            .await
            .unwrap()
            .remove(0)
    }

    pub async fn add_pattern(
        db: &Database,
        name: &str,
        capture: &str,
        template: Option<&str>,
    ) -> Pattern {
        db.insert_pattern(&NewPattern {
            name: name.to_string(),
            capture_pattern: capture.to_string(),
            template: template.map(str::to_string),
            confirmed: false,
        })
        .await
        .unwrap()
    }
}
