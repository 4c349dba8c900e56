//! Pattern table operations

use crate::error::{map_unique, DbError, Result};
use crate::types::*;
use crate::{get_millis, placeholders, Database, IN_CLAUSE_CHUNK};
use clearfile_ids::PatternId;
use sqlx::Row;

const PATTERN_COLUMNS: &str =
    "id, name, capture_pattern, template, confirmed, created_at, updated_at";

impl Database {
    /// Insert a pattern. A duplicate name is a [`DbError::Constraint`].
    pub async fn insert_pattern(&self, pattern: &NewPattern) -> Result<Pattern> {
        let now = Self::now_millis();

        let result = sqlx::query(
            r#"
            INSERT INTO patterns (name, capture_pattern, template, confirmed, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&pattern.name)
        .bind(&pattern.capture_pattern)
        .bind(&pattern.template)
        .bind(pattern.confirmed)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, || format!("Pattern name already exists: {}", pattern.name)))?;

        let id = PatternId::new(result.last_insert_rowid());
        self.get_pattern(id)
            .await?
            .ok_or_else(|| DbError::invalid_state(format!("Pattern {} vanished after insert", id)))
    }

    /// Overwrite name, capture pattern, template and confirmation of an existing pattern.
    pub async fn update_pattern(&self, pattern: &Pattern) -> Result<Pattern> {
        let result = sqlx::query(
            r#"
            UPDATE patterns SET
                name = ?,
                capture_pattern = ?,
                template = ?,
                confirmed = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&pattern.name)
        .bind(&pattern.capture_pattern)
        .bind(&pattern.template)
        .bind(pattern.confirmed)
        .bind(Self::now_millis())
        .bind(pattern.id.get())
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, || format!("Pattern name already exists: {}", pattern.name)))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(format!("Pattern {}", pattern.id)));
        }

        self.get_pattern(pattern.id)
            .await?
            .ok_or_else(|| DbError::not_found(format!("Pattern {}", pattern.id)))
    }

    /// Get a pattern by ID
    pub async fn get_pattern(&self, id: PatternId) -> Result<Option<Pattern>> {
        let row = sqlx::query(&format!("SELECT {PATTERN_COLUMNS} FROM patterns WHERE id = ?"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row_to_pattern(&row)))
    }

    /// Get patterns by ID, in id order. Unknown ids are skipped.
    pub async fn get_patterns_by_ids(&self, ids: &[PatternId]) -> Result<Vec<Pattern>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut patterns = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(IN_CLAUSE_CHUNK) {
            let sql = format!(
                "SELECT {PATTERN_COLUMNS} FROM patterns WHERE id IN ({})",
                placeholders(chunk.len())
            );
            let mut query = sqlx::query(&sql);
            for id in chunk {
                query = query.bind(id.get());
            }
            let rows = query.fetch_all(&self.pool).await?;
            patterns.extend(rows.iter().map(row_to_pattern));
        }

        patterns.sort_by_key(|p| p.id);
        patterns.dedup_by_key(|p| p.id);
        Ok(patterns)
    }

    /// Get a pattern by its unique name
    pub async fn find_pattern_by_name(&self, name: &str) -> Result<Option<Pattern>> {
        let row = sqlx::query(&format!("SELECT {PATTERN_COLUMNS} FROM patterns WHERE name = ?"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row_to_pattern(&row)))
    }

    /// List all patterns in creation order (the candidate order for selection).
    pub async fn list_patterns(&self) -> Result<Vec<Pattern>> {
        let rows = sqlx::query(&format!("SELECT {PATTERN_COLUMNS} FROM patterns ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(row_to_pattern).collect())
    }

    /// List confirmed patterns in creation order
    pub async fn list_confirmed_patterns(&self) -> Result<Vec<Pattern>> {
        let rows = sqlx::query(&format!(
            "SELECT {PATTERN_COLUMNS} FROM patterns WHERE confirmed = 1 ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_pattern).collect())
    }

    /// Delete a pattern and every extraction row it produced.
    ///
    /// Returns false when no such pattern exists. Files that pointed at the
    /// pattern keep their cached info until the next reapplication.
    pub async fn delete_pattern(&self, id: PatternId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM extracted_data WHERE pattern_id = ?")
            .bind(id.get())
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM patterns WHERE id = ?")
            .bind(id.get())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_pattern(row: &sqlx::sqlite::SqliteRow) -> Pattern {
    Pattern {
        id: PatternId::new(row.get("id")),
        name: row.get("name"),
        capture_pattern: row.get("capture_pattern"),
        template: row.get("template"),
        confirmed: row.get("confirmed"),
        created_at: get_millis(row, "created_at"),
        updated_at: get_millis(row, "updated_at"),
    }
}
