//! Change request (rename-and-copy history) operations

use crate::error::{DbError, Result};
use crate::types::*;
use crate::{get_millis, Database};
use clearfile_ids::{ChangeRequestId, FileId, PatternId};
use sqlx::Row;

impl Database {
    /// Persist a change request and its per-file targets atomically.
    pub async fn insert_change_request(&self, request: &NewChangeRequest) -> Result<ChangeRequest> {
        let now = Self::now_millis();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO change_requests (
                pattern_id, rename_template, destination_path, status,
                success_count, failed_count, details, created_at
            ) VALUES (?, ?, ?, 'completed', ?, ?, ?, ?)
            "#,
        )
        .bind(request.pattern_id.get())
        .bind(&request.rename_template)
        .bind(&request.destination_path)
        .bind(request.success_count as i64)
        .bind(request.failed_count as i64)
        .bind(&request.details)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        let request_id = result.last_insert_rowid();

        for target in &request.targets {
            sqlx::query(
                r#"
                INSERT INTO change_request_targets (request_id, original_file_id, new_filename, status, message)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(request_id)
            .bind(target.original_file_id.get())
            .bind(&target.new_filename)
            .bind(target.status.as_str())
            .bind(&target.message)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let id = ChangeRequestId::new(request_id);
        self.get_change_request(id)
            .await?
            .ok_or_else(|| DbError::invalid_state(format!("Change request {} vanished after insert", id)))
    }

    /// Get a change request with its targets
    pub async fn get_change_request(&self, id: ChangeRequestId) -> Result<Option<ChangeRequest>> {
        let row = sqlx::query("SELECT * FROM change_requests WHERE id = ?")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let mut request = row_to_change_request(&row);
                request.targets = self.change_request_targets(id).await?;
                Ok(Some(request))
            }
            None => Ok(None),
        }
    }

    /// List change requests, newest first, each with its targets.
    pub async fn list_change_requests(&self, skip: u64, limit: u64) -> Result<Vec<ChangeRequest>> {
        let rows = sqlx::query("SELECT * FROM change_requests ORDER BY id DESC LIMIT ? OFFSET ?")
            .bind(limit as i64)
            .bind(skip as i64)
            .fetch_all(&self.pool)
            .await?;

        let mut requests = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut request = row_to_change_request(row);
            request.targets = self.change_request_targets(request.id).await?;
            requests.push(request);
        }
        Ok(requests)
    }

    pub async fn count_change_requests(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM change_requests")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn change_request_targets(&self, id: ChangeRequestId) -> Result<Vec<ChangeRequestTarget>> {
        let rows = sqlx::query(
            "SELECT original_file_id, new_filename, status, message FROM change_request_targets WHERE request_id = ? ORDER BY id",
        )
        .bind(id.get())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let status: String = row.get("status");
                Ok(ChangeRequestTarget {
                    original_file_id: FileId::new(row.get("original_file_id")),
                    new_filename: row.get("new_filename"),
                    status: TargetStatus::parse(&status).ok_or_else(|| {
                        DbError::invalid_state(format!("Unknown target status: {}", status))
                    })?,
                    message: row.get("message"),
                })
            })
            .collect()
    }
}

fn row_to_change_request(row: &sqlx::sqlite::SqliteRow) -> ChangeRequest {
    ChangeRequest {
        id: ChangeRequestId::new(row.get("id")),
        pattern_id: PatternId::new(row.get("pattern_id")),
        rename_template: row.get("rename_template"),
        destination_path: row.get("destination_path"),
        status: row.get("status"),
        success_count: row.get::<i64, _>("success_count") as u64,
        failed_count: row.get::<i64, _>("failed_count") as u64,
        details: row.get("details"),
        targets: Vec::new(),
        created_at: get_millis(row, "created_at"),
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use crate::*;
    use clearfile_ids::{ChangeRequestId, FileId, PatternId};

    fn request(pattern_id: PatternId, targets: Vec<ChangeRequestTarget>) -> NewChangeRequest {
        NewChangeRequest {
            pattern_id,
            rename_template: "{y}_{filename}".to_string(),
            destination_path: "/out".to_string(),
            success_count: 1,
            failed_count: 1,
            details: "a: ok, b: failed".to_string(),
            targets,
        }
    }

    #[tokio::test]
    async fn insert_and_read_back_with_targets() {
        let (db, _tmp) = temp_db().await;
        let targets = vec![
            ChangeRequestTarget {
                original_file_id: FileId::new(1),
                new_filename: "2021_a.pdf".to_string(),
                status: TargetStatus::Copied,
                message: Some("Successfully copied to 2021_a.pdf".to_string()),
            },
            ChangeRequestTarget {
                original_file_id: FileId::new(2),
                new_filename: "b".to_string(),
                status: TargetStatus::Failed,
                message: None,
            },
        ];

        let stored = db
            .insert_change_request(&request(PatternId::new(3), targets))
            .await
            .unwrap();
        assert_eq!(stored.status, "completed");
        assert_eq!(stored.targets.len(), 2);
        assert_eq!(stored.targets[1].status, TargetStatus::Failed);

        let fetched = db.get_change_request(stored.id).await.unwrap().unwrap();
        assert_eq!(fetched.rename_template, "{y}_{filename}");
        assert_eq!(fetched.success_count, 1);
        assert!(db.get_change_request(ChangeRequestId::new(99)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let (db, _tmp) = temp_db().await;
        let first = db.insert_change_request(&request(PatternId::new(1), vec![])).await.unwrap();
        let second = db.insert_change_request(&request(PatternId::new(2), vec![])).await.unwrap();

        let listed = db.list_change_requests(0, 10).await.unwrap();
        assert_eq!(listed.iter().map(|r| r.id).collect::<Vec<_>>(), vec![second.id, first.id]);
        assert_eq!(db.count_change_requests().await.unwrap(), 2);
    }
}
