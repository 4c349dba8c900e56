//! File table operations

use crate::error::{DbError, Result};
use crate::types::*;
use crate::{get_millis, parse_values, placeholders, Database, IN_CLAUSE_CHUNK};
use clearfile_ids::{FileId, PatternId};
use sqlx::Row;
use std::collections::HashSet;

const FILE_COLUMNS: &str = "id, filename, extension, directory, full_path, size, extracted_info, \
     extraction_failed, extraction_failure_reason, created_at, updated_at";

impl Database {
    /// Insert a batch of new files in one transaction, returning the stored rows.
    ///
    /// Callers dedup against [`Database::find_files_by_paths`] first; a path that
    /// already exists is a constraint error and rolls back the whole batch.
    pub async fn insert_files(&self, files: &[NewFile]) -> Result<Vec<FileRecord>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let now = Self::now_millis();
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(files.len());

        for file in files {
            let result = sqlx::query(
                r#"
                INSERT INTO files (filename, extension, directory, full_path, size, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&file.filename)
            .bind(&file.extension)
            .bind(&file.directory)
            .bind(&file.full_path)
            .bind(file.size as i64)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| crate::error::map_unique(e, || format!("File already indexed: {}", file.full_path)))?;

            ids.push(FileId::new(result.last_insert_rowid()));
        }

        tx.commit().await?;

        self.get_files_by_ids(&ids).await
    }

    /// Get a file by ID
    pub async fn get_file(&self, id: FileId) -> Result<Option<FileRecord>> {
        let row = sqlx::query(&format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| row_to_file(&row)).transpose()
    }

    /// Get files by ID, in id order. Unknown ids are skipped.
    pub async fn get_files_by_ids(&self, ids: &[FileId]) -> Result<Vec<FileRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut files = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(IN_CLAUSE_CHUNK) {
            let sql = format!(
                "SELECT {FILE_COLUMNS} FROM files WHERE id IN ({})",
                placeholders(chunk.len())
            );
            let mut query = sqlx::query(&sql);
            for id in chunk {
                query = query.bind(id.get());
            }
            for row in query.fetch_all(&self.pool).await? {
                files.push(row_to_file(&row)?);
            }
        }

        files.sort_by_key(|f| f.id);
        files.dedup_by_key(|f| f.id);
        Ok(files)
    }

    /// Find already-indexed files among a set of full paths.
    pub async fn find_files_by_paths(&self, paths: &HashSet<String>) -> Result<Vec<FileRecord>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let paths: Vec<&String> = paths.iter().collect();
        let mut files = Vec::new();
        for chunk in paths.chunks(IN_CLAUSE_CHUNK) {
            let sql = format!(
                "SELECT {FILE_COLUMNS} FROM files WHERE full_path IN ({})",
                placeholders(chunk.len())
            );
            let mut query = sqlx::query(&sql);
            for path in chunk {
                query = query.bind(*path);
            }
            for row in query.fetch_all(&self.pool).await? {
                files.push(row_to_file(&row)?);
            }
        }
        Ok(files)
    }

    /// List a page of files with optional filename filter and sort.
    pub async fn list_files(&self, filter: &FileQuery) -> Result<Vec<FileRecord>> {
        let mut sql = format!("SELECT {FILE_COLUMNS} FROM files WHERE 1=1");
        if filter.filename.is_some() {
            sql.push_str(" AND filename LIKE ?");
        }
        // Secondary id sort keeps paging stable across equal keys.
        sql.push_str(&format!(
            " ORDER BY {} {}, id ASC LIMIT ? OFFSET ?",
            filter.sort.column(),
            filter.order.keyword()
        ));

        let mut query = sqlx::query(&sql);
        if let Some(ref name) = filter.filename {
            query = query.bind(format!("%{}%", name));
        }
        let rows = query
            .bind(filter.limit as i64)
            .bind(filter.skip as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_file).collect()
    }

    /// Count files, optionally restricted by the same filename filter as [`Database::list_files`].
    pub async fn count_files(&self, filename: Option<&str>) -> Result<u64> {
        let count: i64 = match filename {
            Some(name) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM files WHERE filename LIKE ?")
                    .bind(format!("%{}%", name))
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM files")
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count as u64)
    }

    /// Files whose stored extraction came from the given pattern.
    pub async fn list_files_by_pattern(&self, pattern_id: PatternId) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT f.id, f.filename, f.extension, f.directory, f.full_path, f.size,
                   f.extracted_info, f.extraction_failed, f.extraction_failure_reason,
                   f.created_at, f.updated_at
            FROM files f
            WHERE f.id IN (SELECT file_id FROM extracted_data WHERE pattern_id = ?)
            ORDER BY f.id
            "#,
        )
        .bind(pattern_id.get())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_file).collect()
    }

    /// Mark a file as failed: set the flag and reason, clear the cached info.
    ///
    /// Extraction rows are left untouched.
    pub async fn record_extraction_failure(&self, file_id: FileId, reason: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE files SET
                extraction_failed = 1,
                extraction_failure_reason = ?,
                extracted_info = '{}',
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(reason)
        .bind(Self::now_millis())
        .bind(file_id.get())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(format!("File {}", file_id)));
        }
        Ok(())
    }
}

pub(crate) fn row_to_file(row: &sqlx::sqlite::SqliteRow) -> Result<FileRecord> {
    let extracted_info: String = row.get("extracted_info");

    Ok(FileRecord {
        id: FileId::new(row.get("id")),
        filename: row.get("filename"),
        extension: row.get("extension"),
        directory: row.get("directory"),
        full_path: row.get("full_path"),
        size: row.get::<i64, _>("size") as u64,
        extracted_info: parse_values(&extracted_info)?,
        extraction_failed: row.get("extraction_failed"),
        extraction_failure_reason: row.get("extraction_failure_reason"),
        created_at: get_millis(row, "created_at"),
        updated_at: get_millis(row, "updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use crate::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn insert_and_fetch_files() {
        let (db, _tmp) = temp_db().await;

        let inserted = db
            .insert_files(&[new_file("/docs/a.pdf", 1), new_file("/docs/b.txt", 2)])
            .await
            .unwrap();
        assert_eq!(inserted.len(), 2);
        assert_eq!(inserted[0].filename, "a");
        assert!(inserted[0].extracted_info.is_empty());
        assert!(!inserted[0].extraction_failed);

        let fetched = db.get_file(inserted[1].id).await.unwrap().unwrap();
        assert_eq!(fetched.full_path, "/docs/b.txt");
        assert_eq!(fetched.size, 2);

        assert!(db.get_file(clearfile_ids::FileId::new(999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_path_is_a_constraint_error() {
        let (db, _tmp) = temp_db().await;
        db.insert_files(&[new_file("/x/a.pdf", 1)]).await.unwrap();

        let err = db.insert_files(&[new_file("/x/a.pdf", 1)]).await.unwrap_err();
        assert!(matches!(err, DbError::Constraint(_)));
        assert_eq!(db.count_files(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn find_by_paths_returns_only_known() {
        let (db, _tmp) = temp_db().await;
        db.insert_files(&[new_file("/x/a.pdf", 1)]).await.unwrap();

        let paths: HashSet<String> = ["/x/a.pdf".to_string(), "/x/b.pdf".to_string()].into();
        let found = db.find_files_by_paths(&paths).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].full_path, "/x/a.pdf");
    }

    #[tokio::test]
    async fn lookups_past_the_sqlite_variable_limit() {
        let (db, _tmp) = temp_db().await;
        let inserted = db
            .insert_files(&[new_file("/big/a.pdf", 1), new_file("/big/b.pdf", 2)])
            .await
            .unwrap();

        let mut ids: Vec<clearfile_ids::FileId> =
            (1..=40_000).rev().map(clearfile_ids::FileId::new).collect();
        ids.push(inserted[0].id);
        let found = db.get_files_by_ids(&ids).await.unwrap();
        assert_eq!(
            found.iter().map(|f| f.id).collect::<Vec<_>>(),
            vec![inserted[0].id, inserted[1].id]
        );

        let mut paths: HashSet<String> = (0..40_000).map(|i| format!("/nowhere/{i}.txt")).collect();
        paths.insert("/big/b.pdf".to_string());
        let found = db.find_files_by_paths(&paths).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].full_path, "/big/b.pdf");
    }

    #[tokio::test]
    async fn list_files_pages_filters_and_sorts() {
        let (db, _tmp) = temp_db().await;
        let batch: Vec<NewFile> = (0..5)
            .map(|i| new_file(&format!("/d/file_{i}.txt"), 10 - i))
            .chain(std::iter::once(new_file("/d/other.txt", 100)))
            .collect();
        db.insert_files(&batch).await.unwrap();

        let page = db.list_files(&FileQuery::page(2, 2)).await.unwrap();
        assert_eq!(
            page.iter().map(|f| f.filename.as_str()).collect::<Vec<_>>(),
            vec!["file_2", "file_3"]
        );

        let filtered = FileQuery {
            limit: 10,
            filename: Some("file_".to_string()),
            sort: FileSortField::Size,
            order: SortOrder::Asc,
            ..FileQuery::default()
        };
        let rows = db.list_files(&filtered).await.unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].filename, "file_4");
        assert_eq!(db.count_files(Some("file_")).await.unwrap(), 5);
        assert_eq!(db.count_files(None).await.unwrap(), 6);

        let past_end = db.list_files(&FileQuery::page(6, 10)).await.unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn failure_clears_info_and_sets_reason() {
        let (db, _tmp) = temp_db().await;
        let file = db.insert_files(&[new_file("/x/a.pdf", 1)]).await.unwrap().remove(0);

        db.record_extraction_failure(file.id, "nothing matched").await.unwrap();

        let stored = db.get_file(file.id).await.unwrap().unwrap();
        assert!(stored.extraction_failed);
        assert_eq!(stored.extraction_failure_reason.as_deref(), Some("nothing matched"));
        assert!(stored.extracted_info.is_empty());

        let missing = db
            .record_extraction_failure(clearfile_ids::FileId::new(42), "x")
            .await
            .unwrap_err();
        assert!(missing.is_not_found());
    }
}
