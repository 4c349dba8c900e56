//! Persisting extraction outcomes
//!
//! Every write goes through [`Database::record_extraction_success`] or
//! [`Database::record_extraction_failure`], so a file never holds more than one
//! active extraction regardless of which flow produced it.

use super::{compile_patterns, select_best, CompiledPattern};
use crate::error::{ClearfileError, Result};
use clearfile_db::{Database, ExtractedData, ExtractedValues, FileRecord, Pattern};
use clearfile_ids::FileId;
use tracing::{debug, info};

/// Reason stored on a file when no candidate pattern produced data.
pub const FAILURE_REASON: &str = "all patterns were applied but no data could be extracted";

/// Applies candidate patterns to files and writes the result.
#[derive(Clone)]
pub struct ExtractionSync {
    db: Database,
}

impl ExtractionSync {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Select the best pattern for `file` and persist the outcome.
    ///
    /// Returns the stored extraction on success and `None` when no pattern
    /// produced data. The in-memory record is updated to mirror what was
    /// written.
    pub async fn apply(
        &self,
        file: &mut FileRecord,
        patterns: &[CompiledPattern],
    ) -> Result<Option<ExtractedData>> {
        file.clear_failure();

        match select_best(file, patterns) {
            Some(selection) => {
                let stored = self
                    .db
                    .record_extraction_success(file.id, selection.pattern_id, &selection.values)
                    .await?;
                debug!(
                    file_id = %file.id,
                    pattern_id = %selection.pattern_id,
                    fields = selection.values.len(),
                    "Extraction stored"
                );
                file.extracted_info = selection.values;
                Ok(Some(stored))
            }
            None => {
                self.db.record_extraction_failure(file.id, FAILURE_REASON).await?;
                debug!(file_id = %file.id, "No pattern extracted data");
                file.extraction_failed = true;
                file.extraction_failure_reason = Some(FAILURE_REASON.to_string());
                file.extracted_info = ExtractedValues::new();
                Ok(None)
            }
        }
    }

    /// Like [`ExtractionSync::apply`] for uncompiled patterns. Invalid capture
    /// patterns are skipped.
    pub async fn apply_patterns(
        &self,
        file: &mut FileRecord,
        patterns: &[Pattern],
    ) -> Result<Option<ExtractedData>> {
        let compiled = compile_patterns(patterns);
        self.apply(file, &compiled).await
    }

    /// Run every stored pattern against one file and return the refreshed row.
    ///
    /// Unlike the bulk flows, a file that nothing matched is an error here,
    /// after the failure state has been persisted.
    pub async fn apply_to_file(&self, file_id: FileId) -> Result<FileRecord> {
        let mut file = self
            .db
            .get_file(file_id)
            .await?
            .ok_or(ClearfileError::FileNotFound(file_id))?;

        let patterns = self.db.list_patterns().await?;
        if patterns.is_empty() {
            return Err(ClearfileError::NoPatterns);
        }

        if self.apply_patterns(&mut file, &patterns).await?.is_none() {
            return Err(ClearfileError::ExtractionFailed {
                file_id,
                reason: FAILURE_REASON.to_string(),
            });
        }

        info!(file_id = %file_id, "Patterns applied to file");
        self.db
            .get_file(file_id)
            .await?
            .ok_or(ClearfileError::FileNotFound(file_id))
    }
}
