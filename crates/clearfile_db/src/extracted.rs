//! Extraction row operations
//!
//! A file has at most one active extraction: [`Database::record_extraction_success`]
//! replaces whatever was stored before inside a single transaction.

use crate::error::{DbError, Result};
use crate::types::*;
use crate::{get_millis, parse_values, Database};
use clearfile_ids::{ExtractionId, FileId, PatternId};
use sqlx::Row;

impl Database {
    /// Persist a winning extraction for a file.
    ///
    /// In one transaction: clear the file's failure markers and cache `values`
    /// as its extracted info, delete every prior extraction of the file, insert
    /// the new row. Fails with [`DbError::NotFound`] if the file does not exist.
    pub async fn record_extraction_success(
        &self,
        file_id: FileId,
        pattern_id: PatternId,
        values: &ExtractedValues,
    ) -> Result<ExtractedData> {
        let now = Self::now_millis();
        let values_json = serde_json::to_string(values)?;
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE files SET
                extraction_failed = 0,
                extraction_failure_reason = NULL,
                extracted_info = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&values_json)
        .bind(now)
        .bind(file_id.get())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(DbError::not_found(format!("File {}", file_id)));
        }

        sqlx::query("DELETE FROM extracted_data WHERE file_id = ?")
            .bind(file_id.get())
            .execute(&mut *tx)
            .await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO extracted_data (file_id, pattern_id, extracted_values, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(file_id.get())
        .bind(pattern_id.get())
        .bind(&values_json)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ExtractedData {
            id: ExtractionId::new(inserted.last_insert_rowid()),
            file_id,
            pattern_id,
            values: values.clone(),
            created_at: Self::millis_to_datetime(now),
        })
    }

    /// Insert a raw extraction row without touching the file or other rows.
    pub async fn insert_extraction(
        &self,
        file_id: FileId,
        pattern_id: PatternId,
        values: &ExtractedValues,
    ) -> Result<ExtractedData> {
        let now = Self::now_millis();
        let result = sqlx::query(
            r#"
            INSERT INTO extracted_data (file_id, pattern_id, extracted_values, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(file_id.get())
        .bind(pattern_id.get())
        .bind(serde_json::to_string(values)?)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(ExtractedData {
            id: ExtractionId::new(result.last_insert_rowid()),
            file_id,
            pattern_id,
            values: values.clone(),
            created_at: Self::millis_to_datetime(now),
        })
    }

    /// All extraction rows of a file
    pub async fn extractions_for_file(&self, file_id: FileId) -> Result<Vec<ExtractedData>> {
        let rows = sqlx::query(
            "SELECT id, file_id, pattern_id, extracted_values, created_at FROM extracted_data WHERE file_id = ? ORDER BY id",
        )
        .bind(file_id.get())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_extraction).collect()
    }

    /// All extraction rows produced by a pattern
    pub async fn extractions_for_pattern(&self, pattern_id: PatternId) -> Result<Vec<ExtractedData>> {
        let rows = sqlx::query(
            "SELECT id, file_id, pattern_id, extracted_values, created_at FROM extracted_data WHERE pattern_id = ? ORDER BY id",
        )
        .bind(pattern_id.get())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_extraction).collect()
    }

    /// Delete every extraction of a file. Returns the number of rows removed.
    pub async fn delete_extractions_for_file(&self, file_id: FileId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM extracted_data WHERE file_id = ?")
            .bind(file_id.get())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete the extraction a specific pattern produced for a file.
    pub async fn delete_extraction_for_file_and_pattern(
        &self,
        file_id: FileId,
        pattern_id: PatternId,
    ) -> Result<u64> {
        let result = sqlx::query("DELETE FROM extracted_data WHERE file_id = ? AND pattern_id = ?")
            .bind(file_id.get())
            .bind(pattern_id.get())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

fn row_to_extraction(row: &sqlx::sqlite::SqliteRow) -> Result<ExtractedData> {
    let raw: String = row.get("extracted_values");
    Ok(ExtractedData {
        id: ExtractionId::new(row.get("id")),
        file_id: FileId::new(row.get("file_id")),
        pattern_id: PatternId::new(row.get("pattern_id")),
        values: parse_values(&raw)?,
        created_at: get_millis(row, "created_at"),
    })
}
