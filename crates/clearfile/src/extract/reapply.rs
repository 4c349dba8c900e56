//! Paged reapplication of patterns over the file corpus
//!
//! Files are loaded `page_size` at a time and each one goes through
//! [`ExtractionSync::apply`] independently. A storage error on one file is
//! logged and counted; the run carries on with the next file.

use super::{compile_patterns, CompiledPattern, ExtractionSync};
use crate::error::{ClearfileError, Result};
use clearfile_db::{Database, FileQuery, FileRecord};
use clearfile_ids::{FileId, IdParseError, PatternId};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReapplyConfig {
    /// Files loaded per page
    pub page_size: u64,
}

impl Default for ReapplyConfig {
    fn default() -> Self {
        Self { page_size: 500 }
    }
}

/// Cooperative cancellation for a reapplication run, checked between pages.
///
/// Clone is cheap and shares state.
#[derive(Debug, Clone, Default)]
pub struct ReapplyCancelToken {
    cancelled: Arc<AtomicBool>,
}

impl ReapplyCancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// Which files a run touches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSelection {
    All,
    Ids(Vec<FileId>),
}

impl FileSelection {
    /// Parse `all` or a comma-separated id list such as `3,7,12`.
    pub fn parse(s: &str) -> std::result::Result<Self, IdParseError> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(FileId::parse)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Self::Ids)
    }
}

/// Outcome counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReapplySummary {
    pub files_seen: u64,
    pub files_extracted: u64,
    pub files_failed: u64,
    /// Files skipped because persisting their outcome failed
    pub errors: u64,
    pub pages: u64,
    pub cancelled: bool,
}

/// Drives pattern application over pages of files.
pub struct Reapplier {
    db: Database,
    sync: ExtractionSync,
    config: ReapplyConfig,
    cancel: Option<ReapplyCancelToken>,
}

impl Reapplier {
    pub fn new(db: Database, config: ReapplyConfig) -> Self {
        let sync = ExtractionSync::new(db.clone());
        Self {
            db,
            sync,
            config: ReapplyConfig {
                page_size: config.page_size.max(1),
            },
            cancel: None,
        }
    }

    pub fn with_cancel_token(mut self, token: ReapplyCancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Re-score every file against every pattern.
    pub async fn reapply_all(&self) -> Result<ReapplySummary> {
        self.reapply_subset(&FileSelection::All).await
    }

    /// Re-score the selected files against every pattern.
    ///
    /// With no patterns stored this is a no-op: no file is read or written.
    pub async fn reapply_subset(&self, selection: &FileSelection) -> Result<ReapplySummary> {
        let patterns = self.db.list_patterns().await?;
        if patterns.is_empty() {
            debug!("No patterns stored, nothing to reapply");
            return Ok(ReapplySummary::default());
        }

        let compiled = compile_patterns(&patterns);
        self.run(&compiled, selection).await
    }

    /// Apply a chosen set of saved patterns to the selected files.
    ///
    /// Only confirmed patterns among `pattern_ids` take part. Any id that does
    /// not name a stored pattern fails the call before a file is touched.
    pub async fn apply_saved_patterns(
        &self,
        pattern_ids: &[PatternId],
        selection: &FileSelection,
    ) -> Result<ReapplySummary> {
        let requested: BTreeSet<PatternId> = pattern_ids.iter().copied().collect();
        let found = self
            .db
            .get_patterns_by_ids(&requested.iter().copied().collect::<Vec<_>>())
            .await?;

        if found.len() != requested.len() {
            let missing: Vec<String> = requested
                .iter()
                .filter(|id| !found.iter().any(|p| p.id == **id))
                .map(|id| id.to_string())
                .collect();
            return Err(ClearfileError::PatternNotFound(missing.join(", ")));
        }

        let confirmed: Vec<_> = found.into_iter().filter(|p| p.confirmed).collect();
        if confirmed.is_empty() {
            info!("None of the requested patterns are confirmed, nothing to apply");
            return Ok(ReapplySummary::default());
        }

        let compiled = compile_patterns(&confirmed);
        self.run(&compiled, selection).await
    }

    async fn run(
        &self,
        patterns: &[CompiledPattern],
        selection: &FileSelection,
    ) -> Result<ReapplySummary> {
        let mut summary = ReapplySummary::default();

        match selection {
            FileSelection::All => {
                let mut skip = 0u64;
                loop {
                    if self.is_cancelled() {
                        summary.cancelled = true;
                        break;
                    }
                    let page = self
                        .db
                        .list_files(&FileQuery::page(skip, self.config.page_size))
                        .await?;
                    if page.is_empty() {
                        break;
                    }
                    skip += page.len() as u64;
                    self.process_page(page, patterns, &mut summary).await;
                }
            }
            FileSelection::Ids(ids) => {
                let unique: Vec<FileId> = ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
                for chunk in unique.chunks(self.config.page_size as usize) {
                    if self.is_cancelled() {
                        summary.cancelled = true;
                        break;
                    }
                    let page = self.db.get_files_by_ids(chunk).await?;
                    if page.len() < chunk.len() {
                        debug!(requested = chunk.len(), found = page.len(), "Some selected files do not exist");
                    }
                    self.process_page(page, patterns, &mut summary).await;
                }
            }
        }

        info!(
            files = summary.files_seen,
            extracted = summary.files_extracted,
            failed = summary.files_failed,
            errors = summary.errors,
            pages = summary.pages,
            cancelled = summary.cancelled,
            "Reapplication finished"
        );
        Ok(summary)
    }

    async fn process_page(
        &self,
        page: Vec<FileRecord>,
        patterns: &[CompiledPattern],
        summary: &mut ReapplySummary,
    ) {
        summary.pages += 1;
        let page_len = page.len();

        for mut file in page {
            summary.files_seen += 1;
            match self.sync.apply(&mut file, patterns).await {
                Ok(Some(_)) => summary.files_extracted += 1,
                Ok(None) => summary.files_failed += 1,
                Err(e) => {
                    warn!(file_id = %file.id, path = %file.full_path, error = %e, "Skipping file");
                    summary.errors += 1;
                }
            }
        }

        debug!(page = summary.pages, files = page_len, "Page processed");
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(ReapplyCancelToken::is_cancelled)
    }
}
