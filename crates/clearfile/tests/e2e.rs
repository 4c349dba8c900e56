//! End-to-end tests for Clearfile
//!
//! Each test builds a real directory tree, indexes it into a temporary
//! database and drives the engine the way the CLI does.

use clearfile::{
    ChangeService, ClearfileError, FileSelection, Indexer, PatternService, PatternUpdate,
    ReapplyConfig, Reapplier,
};
use clearfile_db::{Database, FileQuery, FileRecord, TargetStatus};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a test environment with temp directories
struct TestEnv {
    _temp: TempDir,
    pub library: PathBuf,
    pub output: PathBuf,
    pub db: Database,
}

impl TestEnv {
    async fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let library = temp.path().join("library");
        let output = temp.path().join("output");
        fs::create_dir_all(&library).expect("Failed to create library dir");

        let db = Database::open(temp.path().join("clearfile.sqlite3"))
            .await
            .expect("Failed to open database");

        Self {
            _temp: temp,
            library,
            output,
            db,
        }
    }

    fn write_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.library.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok();
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    async fn index(&self) {
        Indexer::new(self.db.clone(), 2)
            .index_directory(&self.library)
            .await
            .expect("Indexing failed");
    }

    fn patterns(&self) -> PatternService {
        PatternService::new(self.db.clone(), ReapplyConfig { page_size: 2 })
    }

    async fn file_named(&self, filename: &str) -> FileRecord {
        self.db
            .list_files(&FileQuery::page(0, 1000))
            .await
            .unwrap()
            .into_iter()
            .find(|f| f.filename == filename)
            .unwrap_or_else(|| panic!("{filename} not indexed"))
    }
}

// ============================================================================
// Extraction
// ============================================================================

#[tokio::test]
async fn test_pattern_creation_scores_the_corpus() {
    let env = TestEnv::new().await;
    env.write_file("reports/report_2021.pdf", "a");
    env.write_file("reports/report_2022.pdf", "b");
    env.write_file("notes/todo.txt", "c");
    env.index().await;

    let change = env
        .patterns()
        .create("reports", r"report_(?P<year>\d+)\.pdf", Some(r#"{"y": "$year:d$"}"#))
        .await
        .unwrap();

    assert_eq!(change.reapplied.files_seen, 3);
    assert_eq!(change.reapplied.files_extracted, 2);
    assert_eq!(change.reapplied.files_failed, 1);
    assert_eq!(change.reapplied.pages, 2);

    let report = env.file_named("report_2022").await;
    assert_eq!(json!(report.extracted_info), json!({"y": 2022}));
    assert!(!report.extraction_failed);

    let todo = env.file_named("todo").await;
    assert!(todo.extraction_failed);
    assert!(todo.extracted_info.is_empty());
}

#[tokio::test]
async fn test_richer_pattern_takes_over_and_old_rows_go() {
    let env = TestEnv::new().await;
    env.write_file("comics/batman_12.cbz", "x");
    env.index().await;
    let patterns = env.patterns();

    let title_only = patterns
        .create("title", r"(?P<title>[a-z]+)_\d+", Some(r#"{"title": "$title:s$"}"#))
        .await
        .unwrap()
        .pattern;
    let with_issue = patterns
        .create(
            "issue",
            r"(?P<title>[a-z]+)_(?P<issue>\d+)",
            Some(r#"{"title": "$title:s$", "issue": "$issue:d$", "kind": "comic"}"#),
        )
        .await
        .unwrap()
        .pattern;

    let file = env.file_named("batman_12").await;
    assert_eq!(file.extracted_info["issue"], json!(12));
    assert_eq!(file.extracted_info["kind"], json!("comic"));

    let rows = env.db.extractions_for_file(file.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].pattern_id, with_issue.id);
    assert!(env.db.extractions_for_pattern(title_only.id).await.unwrap().is_empty());

    // Narrowing the richer pattern's template hands the file back to the first one on a tie.
    patterns
        .update(
            with_issue.id,
            PatternUpdate {
                template: Some(Some(r#"{"title": "$title:s$"}"#.to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let rows = env.db.extractions_for_file(file.id).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].pattern_id, title_only.id);
}

#[tokio::test]
async fn test_saved_patterns_on_a_subset() {
    let env = TestEnv::new().await;
    env.write_file("a/report_2021.pdf", "a");
    env.write_file("b/report_2022.pdf", "b");
    env.index().await;

    let confirmed = env
        .patterns()
        .confirm("reports", r"report_(?P<year>\d+)", None)
        .await
        .unwrap()
        .pattern;
    let target = env.file_named("report_2021").await;
    let other = env.file_named("report_2022").await;
    env.db.record_extraction_failure(target.id, "reset").await.unwrap();
    env.db.record_extraction_failure(other.id, "reset").await.unwrap();

    let summary = Reapplier::new(env.db.clone(), ReapplyConfig::default())
        .apply_saved_patterns(&[confirmed.id], &FileSelection::Ids(vec![target.id]))
        .await
        .unwrap();
    assert_eq!(summary.files_seen, 1);

    assert_eq!(env.file_named("report_2021").await.extracted_info["year"], json!("2021"));
    assert!(env.file_named("report_2022").await.extraction_failed);
}

// ============================================================================
// Rename and copy
// ============================================================================

#[tokio::test]
async fn test_rename_and_copy_end_to_end() {
    let env = TestEnv::new().await;
    env.write_file("report_2021.pdf", "2021 report");
    env.write_file("report_x.pdf", "undated");
    env.index().await;

    let pattern = env
        .patterns()
        .create(
            "reports",
            r"report_(?P<year>[^.]+)\.pdf",
            Some(r#"{"y": "$year:d$", "name": "$0:s$"}"#),
        )
        .await
        .unwrap()
        .pattern;

    // `y` is null for report_x, so the strict renderer rejects it.
    let service = ChangeService::new(env.db.clone(), "[NA]");
    let report = service
        .rename_and_copy(pattern.id, "{y}_archive", &env.output)
        .await
        .unwrap();
    assert_eq!(report.success_count, 1);
    assert_eq!(report.failed_count, 1);
    assert_eq!(
        fs::read_to_string(env.output.join("2021_archive.pdf")).unwrap(),
        "2021 report"
    );

    let request = service
        .create_change_request(pattern.id, "{y}_archive", &env.output.join("lenient"))
        .await
        .unwrap();
    assert_eq!(request.success_count, 2);
    assert!(env.output.join("lenient").join("[NA]_archive.pdf").exists());
    assert!(request.targets.iter().all(|t| t.status == TargetStatus::Copied));

    let fetched = service.get_change_request(request.id).await.unwrap().unwrap();
    assert_eq!(fetched.targets.len(), 2);
}

#[tokio::test]
async fn test_single_file_apply_and_errors() {
    let env = TestEnv::new().await;
    env.write_file("report_2021.pdf", "a");
    env.index().await;
    let file = env.file_named("report_2021").await;
    let sync = clearfile::ExtractionSync::new(env.db.clone());

    assert!(matches!(
        sync.apply_to_file(file.id).await.unwrap_err(),
        ClearfileError::NoPatterns
    ));

    env.patterns()
        .create("years", r"report_(?P<year>\d{4})", None)
        .await
        .unwrap();
    let refreshed = sync.apply_to_file(file.id).await.unwrap();
    assert_eq!(refreshed.extracted_info["year"], json!("2021"));
    assert_eq!(refreshed.extracted_info["extension"], json!("pdf"));
}
