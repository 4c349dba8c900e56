//! Rename-and-copy flows
//!
//! Two flows copy the files a pattern currently owns under names rendered
//! from their extracted info:
//!
//! - [`ChangeService::rename_and_copy`] renders strictly, so a missing key
//!   fails that file, and returns a report without persisting anything.
//! - [`ChangeService::create_change_request`] renders leniently with the
//!   configured placeholder and records the run as a [`ChangeRequest`].
//!
//! Neither flow aborts on a per-file failure.

use crate::error::{ClearfileError, Result};
use crate::fileops::{copy_file, target_path};
use crate::rename::{render_filename, MissingKeyPolicy};
use clearfile_db::{
    ChangeRequest, ChangeRequestTarget, Database, FileRecord, NewChangeRequest, TargetStatus,
};
use clearfile_ids::{ChangeRequestId, FileId, PatternId};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Failed,
}

/// Result of one file in a strict rename-and-copy run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameOutcome {
    pub file_id: FileId,
    /// `None` when the file row no longer exists
    pub original_path: Option<String>,
    /// `None` when no target name could be rendered
    pub new_path: Option<String>,
    pub status: OutcomeStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameCopyReport {
    pub success_count: u64,
    pub failed_count: u64,
    pub details: Vec<RenameOutcome>,
}

pub struct ChangeService {
    db: Database,
    missing_placeholder: String,
}

impl ChangeService {
    pub fn new(db: Database, missing_placeholder: impl Into<String>) -> Self {
        Self {
            db,
            missing_placeholder: missing_placeholder.into(),
        }
    }

    /// Copy every file the pattern won into `destination`, renamed strictly.
    pub async fn rename_and_copy(
        &self,
        pattern_id: PatternId,
        rename_template: &str,
        destination: &Path,
    ) -> Result<RenameCopyReport> {
        self.require_pattern(pattern_id).await?;

        let extractions = self.db.extractions_for_pattern(pattern_id).await?;
        let file_ids: Vec<FileId> = extractions.iter().map(|e| e.file_id).collect();
        let files: HashMap<FileId, FileRecord> = self
            .db
            .get_files_by_ids(&file_ids)
            .await?
            .into_iter()
            .map(|f| (f.id, f))
            .collect();

        let mut report = RenameCopyReport::default();
        for file_id in file_ids {
            let outcome = match files.get(&file_id) {
                Some(file) => copy_strict(file, rename_template, destination),
                None => RenameOutcome {
                    file_id,
                    original_path: None,
                    new_path: None,
                    status: OutcomeStatus::Failed,
                    reason: Some(format!("Source file {} is no longer indexed", file_id)),
                },
            };
            match outcome.status {
                OutcomeStatus::Success => report.success_count += 1,
                OutcomeStatus::Failed => {
                    warn!(file_id = %file_id, reason = ?outcome.reason, "Rename and copy failed");
                    report.failed_count += 1
                }
            }
            report.details.push(outcome);
        }

        info!(
            pattern_id = %pattern_id,
            copied = report.success_count,
            failed = report.failed_count,
            "Rename and copy finished"
        );
        Ok(report)
    }

    /// Copy every file the pattern won into `destination`, renamed leniently,
    /// and persist the run with one target per file.
    pub async fn create_change_request(
        &self,
        pattern_id: PatternId,
        rename_template: &str,
        destination: &Path,
    ) -> Result<ChangeRequest> {
        self.require_pattern(pattern_id).await?;
        let files = self.db.list_files_by_pattern(pattern_id).await?;

        let mut targets = Vec::with_capacity(files.len());
        let mut details = Vec::with_capacity(files.len());
        let policy = MissingKeyPolicy::Placeholder(&self.missing_placeholder);

        for file in &files {
            let target = match render_filename(rename_template, &file.extracted_info, &file.extension, policy)
                .and_then(|name| {
                    let target = target_path(destination, &name)?;
                    copy_file(Path::new(&file.full_path), &target).map(|_| name)
                })
            {
                Ok(name) => ChangeRequestTarget {
                    original_file_id: file.id,
                    message: Some(format!("Successfully copied to {}", name)),
                    new_filename: name,
                    status: TargetStatus::Copied,
                },
                Err(e) => {
                    warn!(file_id = %file.id, error = %e, "Copy failed");
                    ChangeRequestTarget {
                        original_file_id: file.id,
                        new_filename: file.filename.clone(),
                        status: TargetStatus::Failed,
                        message: Some(format!("Failed to copy: {}", e)),
                    }
                }
            };
            details.push(format!(
                "{}: {}",
                file.filename,
                target.message.as_deref().unwrap_or_default()
            ));
            targets.push(target);
        }

        let success_count = targets.iter().filter(|t| t.status == TargetStatus::Copied).count() as u64;
        let request = NewChangeRequest {
            pattern_id,
            rename_template: rename_template.to_string(),
            destination_path: destination.to_string_lossy().into_owned(),
            success_count,
            failed_count: targets.len() as u64 - success_count,
            details: details.join(", "),
            targets,
        };

        let stored = self.db.insert_change_request(&request).await?;
        info!(
            request_id = %stored.id,
            copied = stored.success_count,
            failed = stored.failed_count,
            "Change request recorded"
        );
        Ok(stored)
    }

    pub async fn list_change_requests(&self, skip: u64, limit: u64) -> Result<Vec<ChangeRequest>> {
        Ok(self.db.list_change_requests(skip, limit).await?)
    }

    pub async fn count_change_requests(&self) -> Result<u64> {
        Ok(self.db.count_change_requests().await?)
    }

    pub async fn get_change_request(&self, id: ChangeRequestId) -> Result<Option<ChangeRequest>> {
        Ok(self.db.get_change_request(id).await?)
    }

    async fn require_pattern(&self, id: PatternId) -> Result<()> {
        match self.db.get_pattern(id).await? {
            Some(_) => Ok(()),
            None => Err(ClearfileError::PatternNotFound(id.to_string())),
        }
    }
}

fn copy_strict(file: &FileRecord, rename_template: &str, destination: &Path) -> RenameOutcome {
    let failed = |new_path: Option<String>, e: ClearfileError| RenameOutcome {
        file_id: file.id,
        original_path: Some(file.full_path.clone()),
        new_path,
        status: OutcomeStatus::Failed,
        reason: Some(e.to_string()),
    };

    let name = match render_filename(
        rename_template,
        &file.extracted_info,
        &file.extension,
        MissingKeyPolicy::Fail,
    ) {
        Ok(name) => name,
        Err(e) => return failed(None, e),
    };

    let target = match target_path(destination, &name) {
        Ok(target) => target,
        Err(e) => return failed(None, e),
    };
    let new_path = target.to_string_lossy().into_owned();
    match copy_file(Path::new(&file.full_path), &target) {
        Ok(_) => RenameOutcome {
            file_id: file.id,
            original_path: Some(file.full_path.clone()),
            new_path: Some(new_path),
            status: OutcomeStatus::Success,
            reason: None,
        },
        Err(e) => failed(Some(new_path), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractionSync;
    use crate::test_support::*;
    use tempfile::TempDir;

    /// One real file on disk, indexed and matched by a pattern producing `y`.
    async fn setup(db: &Database, dir: &TempDir, name: &str) -> (FileRecord, PatternId) {
        let path = dir.path().join("src").join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"data").unwrap();

        let mut file = add_file(db, path.to_str().unwrap(), 4).await;
        let pattern = match db.find_pattern_by_name("reports").await.unwrap() {
            Some(p) => p,
            None => add_pattern(db, "reports", r"report_(?P<year>\d+)", Some(r#"{"y": "$year:d$"}"#)).await,
        };
        ExtractionSync::new(db.clone())
            .apply_patterns(&mut file, &[pattern.clone()])
            .await
            .unwrap();
        (file, pattern.id)
    }

    #[tokio::test]
    async fn strict_flow_copies_and_reports_missing_keys() {
        let (db, tmp) = temp_db().await;
        let (_, pattern_id) = setup(&db, &tmp, "report_2021.pdf").await;
        let dest = tmp.path().join("out");
        let service = ChangeService::new(db.clone(), "[NA]");

        let report = service.rename_and_copy(pattern_id, "{y}_copy", &dest).await.unwrap();
        assert_eq!(report.success_count, 1);
        assert_eq!(report.failed_count, 0);
        assert!(dest.join("2021_copy.pdf").exists());

        let report = service.rename_and_copy(pattern_id, "{missing}", &dest).await.unwrap();
        assert_eq!(report.failed_count, 1);
        let reason = report.details[0].reason.as_deref().unwrap();
        assert!(reason.contains("missing"), "unexpected reason: {reason}");
        assert!(report.details[0].new_path.is_none());
    }

    #[tokio::test]
    async fn strict_flow_reports_copy_failures_per_file() {
        let (db, tmp) = temp_db().await;
        let (file, pattern_id) = setup(&db, &tmp, "report_2021.pdf").await;
        std::fs::remove_file(&file.full_path).unwrap();

        let report = ChangeService::new(db, "[NA]")
            .rename_and_copy(pattern_id, "{y}", &tmp.path().join("out"))
            .await
            .unwrap();
        assert_eq!(report.failed_count, 1);
        assert_eq!(report.details[0].status, OutcomeStatus::Failed);
        assert!(report.details[0].new_path.as_deref().unwrap().ends_with("2021.pdf"));
    }

    /// A source file matched by a template-less pattern, so its extracted info
    /// carries `full_path` and `directory`, plus a captured `name` of `../../escaped`.
    async fn setup_raw(db: &Database, dir: &TempDir) -> (FileRecord, PatternId) {
        let path = dir.path().join("src").join("report_2021.pdf");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"precious data").unwrap();

        let mut file = add_file(db, path.to_str().unwrap(), 13).await;
        let pattern = add_pattern(db, "raw", r"report_(?P<year>\d+)", None).await;
        ExtractionSync::new(db.clone())
            .apply_patterns(&mut file, &[pattern.clone()])
            .await
            .unwrap();

        let mut values = file.extracted_info.clone();
        values.insert("name".to_string(), serde_json::json!("../../escaped"));
        db.record_extraction_success(file.id, pattern.id, &values).await.unwrap();
        (file, pattern.id)
    }

    const ESCAPING_TEMPLATES: [&str; 3] = ["{full_path}", "{directory}/x", "{name}"];

    #[tokio::test]
    async fn strict_flow_never_writes_outside_the_destination() {
        let (db, tmp) = temp_db().await;
        let (file, pattern_id) = setup_raw(&db, &tmp).await;
        let dest = tmp.path().join("out").join("nested");
        let service = ChangeService::new(db, "[NA]");

        for template in ESCAPING_TEMPLATES {
            let report = service.rename_and_copy(pattern_id, template, &dest).await.unwrap();
            assert_eq!(report.success_count, 0, "{template} was copied");
            assert_eq!(report.failed_count, 1);
            assert!(report.details[0].new_path.is_none());
            let reason = report.details[0].reason.as_deref().unwrap();
            assert!(reason.contains("plain file name"), "unexpected reason: {reason}");
        }

        assert_eq!(std::fs::read(&file.full_path).unwrap(), b"precious data");
        assert!(!tmp.path().join("escaped.pdf").exists());
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn lenient_flow_records_escaping_names_as_failures() {
        let (db, tmp) = temp_db().await;
        let (file, pattern_id) = setup_raw(&db, &tmp).await;
        let dest = tmp.path().join("out").join("nested");
        let service = ChangeService::new(db, "[NA]");

        for template in ESCAPING_TEMPLATES {
            let request = service.create_change_request(pattern_id, template, &dest).await.unwrap();
            assert_eq!(request.success_count, 0, "{template} was copied");
            assert_eq!(request.failed_count, 1);
            let target = &request.targets[0];
            assert_eq!(target.status, TargetStatus::Failed);
            assert_eq!(target.new_filename, "report_2021");
            assert!(target.message.as_deref().unwrap().contains("plain file name"));
        }

        assert_eq!(std::fs::read(&file.full_path).unwrap(), b"precious data");
        assert!(!tmp.path().join("escaped.pdf").exists());
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn unknown_pattern_is_rejected() {
        let (db, tmp) = temp_db().await;
        let service = ChangeService::new(db, "[NA]");
        let err = service
            .rename_and_copy(PatternId::new(5), "{y}", tmp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ClearfileError::PatternNotFound(_)));
    }

    #[tokio::test]
    async fn change_request_is_lenient_and_persisted() {
        let (db, tmp) = temp_db().await;
        let (good, pattern_id) = setup(&db, &tmp, "report_2021.pdf").await;
        let (gone, _) = setup(&db, &tmp, "report_2022.pdf").await;
        std::fs::remove_file(&gone.full_path).unwrap();
        let dest = tmp.path().join("out");

        let request = ChangeService::new(db.clone(), "[NA]")
            .create_change_request(pattern_id, "{y}_{missing}", &dest)
            .await
            .unwrap();

        assert_eq!(request.success_count, 1);
        assert_eq!(request.failed_count, 1);
        assert!(dest.join("2021_[NA].pdf").exists());

        let copied = request.targets.iter().find(|t| t.original_file_id == good.id).unwrap();
        assert_eq!(copied.status, TargetStatus::Copied);
        assert_eq!(copied.new_filename, "2021_[NA].pdf");

        let failed = request.targets.iter().find(|t| t.original_file_id == gone.id).unwrap();
        assert_eq!(failed.status, TargetStatus::Failed);
        assert_eq!(failed.new_filename, "report_2022");
        assert!(failed.message.as_deref().unwrap().starts_with("Failed to copy"));

        let listed = ChangeService::new(db, "[NA]").list_change_requests(0, 10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, request.id);
    }
}
