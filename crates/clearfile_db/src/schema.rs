//! Database schema creation for all Clearfile tables.
//!
//! All CREATE TABLE statements live here - single source of truth.
//! Timestamps are INTEGER milliseconds; JSON maps are TEXT.

use crate::error::Result;
use crate::Database;
use tracing::info;

impl Database {
    /// Ensure all tables exist.
    pub(crate) async fn ensure_schema(&self) -> Result<()> {
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&self.pool)
            .await?;

        self.create_file_tables().await?;
        self.create_change_request_tables().await?;

        info!("Database schema verified");
        Ok(())
    }

    /// Files, patterns and the extraction rows linking them
    async fn create_file_tables(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                extension TEXT NOT NULL DEFAULT '',
                directory TEXT NOT NULL,
                full_path TEXT NOT NULL UNIQUE,
                size INTEGER NOT NULL,
                extracted_info TEXT NOT NULL DEFAULT '{}',
                extraction_failed INTEGER NOT NULL DEFAULT 0,
                extraction_failure_reason TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS patterns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                capture_pattern TEXT NOT NULL,
                template TEXT,
                confirmed INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS extracted_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_id INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
                pattern_id INTEGER NOT NULL REFERENCES patterns(id) ON DELETE CASCADE,
                extracted_values TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_filename ON files(filename)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_extracted_file ON extracted_data(file_id)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_extracted_pattern ON extracted_data(pattern_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Rename-and-copy history
    async fn create_change_request_tables(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS change_requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pattern_id INTEGER NOT NULL,
                rename_template TEXT NOT NULL,
                destination_path TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'completed',
                success_count INTEGER NOT NULL DEFAULT 0,
                failed_count INTEGER NOT NULL DEFAULT 0,
                details TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS change_request_targets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                request_id INTEGER NOT NULL REFERENCES change_requests(id) ON DELETE CASCADE,
                original_file_id INTEGER NOT NULL,
                new_filename TEXT NOT NULL,
                status TEXT NOT NULL CHECK (status IN ('copied', 'failed')),
                message TEXT
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_targets_request ON change_request_targets(request_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
