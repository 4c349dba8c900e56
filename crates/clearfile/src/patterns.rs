//! Pattern management
//!
//! Every mutation of the pattern table re-scores the whole corpus afterwards,
//! so cached file metadata always reflects the current pattern set.

use crate::error::{ClearfileError, Result};
use crate::extract::{CaptureMatcher, Extractor, ReapplyConfig, ReapplySummary, Reapplier};
use clearfile_db::{Database, DbError, ExtractedData, ExtractedValues, NewPattern, Pattern};
use clearfile_ids::{FileId, PatternId};
use std::collections::BTreeMap;
use tracing::info;

/// Partial update of a stored pattern. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct PatternUpdate {
    pub name: Option<String>,
    pub capture_pattern: Option<String>,
    /// `Some(None)` clears the template
    pub template: Option<Option<String>>,
    pub confirmed: Option<bool>,
}

/// A pattern mutation together with the reapplication it triggered.
#[derive(Debug, Clone)]
pub struct PatternChange {
    pub pattern: Pattern,
    pub reapplied: ReapplySummary,
}

pub struct PatternService {
    db: Database,
    reapplier: Reapplier,
}

impl PatternService {
    pub fn new(db: Database, config: ReapplyConfig) -> Self {
        let reapplier = Reapplier::new(db.clone(), config);
        Self { db, reapplier }
    }

    pub async fn list(&self) -> Result<Vec<Pattern>> {
        Ok(self.db.list_patterns().await?)
    }

    pub async fn get(&self, id: PatternId) -> Result<Pattern> {
        self.db
            .get_pattern(id)
            .await?
            .ok_or_else(|| ClearfileError::PatternNotFound(id.to_string()))
    }

    /// Create an unconfirmed pattern.
    pub async fn create(
        &self,
        name: &str,
        capture_pattern: &str,
        template: Option<&str>,
    ) -> Result<PatternChange> {
        CaptureMatcher::compile(capture_pattern)?;
        if self.db.find_pattern_by_name(name).await?.is_some() {
            return Err(ClearfileError::PatternAlreadyExists(name.to_string()));
        }

        let pattern = self
            .db
            .insert_pattern(&NewPattern {
                name: name.to_string(),
                capture_pattern: capture_pattern.to_string(),
                template: template.map(str::to_string),
                confirmed: false,
            })
            .await
            .map_err(|e| duplicate_name(e, name))?;
        info!(pattern_id = %pattern.id, name = %pattern.name, "Pattern created");

        self.reapply(pattern).await
    }

    pub async fn update(&self, id: PatternId, update: PatternUpdate) -> Result<PatternChange> {
        let mut pattern = self.get(id).await?;

        if let Some(capture) = update.capture_pattern {
            CaptureMatcher::compile(&capture)?;
            pattern.capture_pattern = capture;
        }
        if let Some(name) = update.name {
            pattern.name = name;
        }
        if let Some(template) = update.template {
            pattern.template = template;
        }
        if let Some(confirmed) = update.confirmed {
            pattern.confirmed = confirmed;
        }

        let name = pattern.name.clone();
        let pattern = self
            .db
            .update_pattern(&pattern)
            .await
            .map_err(|e| duplicate_name(e, &name))?;
        info!(pattern_id = %pattern.id, "Pattern updated");

        self.reapply(pattern).await
    }

    /// Save a pattern as confirmed, overwriting any pattern with the same name.
    pub async fn confirm(
        &self,
        name: &str,
        capture_pattern: &str,
        template: Option<&str>,
    ) -> Result<PatternChange> {
        CaptureMatcher::compile(capture_pattern)?;

        let pattern = match self.db.find_pattern_by_name(name).await? {
            Some(mut existing) => {
                existing.capture_pattern = capture_pattern.to_string();
                existing.template = template.map(str::to_string);
                existing.confirmed = true;
                self.db.update_pattern(&existing).await?
            }
            None => {
                self.db
                    .insert_pattern(&NewPattern {
                        name: name.to_string(),
                        capture_pattern: capture_pattern.to_string(),
                        template: template.map(str::to_string),
                        confirmed: true,
                    })
                    .await?
            }
        };
        info!(pattern_id = %pattern.id, name = %pattern.name, "Pattern confirmed");

        self.reapply(pattern).await
    }

    /// Delete a pattern and its extraction rows, then re-score every file so
    /// files it used to win are matched against the remaining patterns.
    pub async fn delete(&self, id: PatternId) -> Result<ReapplySummary> {
        if !self.db.delete_pattern(id).await? {
            return Err(ClearfileError::PatternNotFound(id.to_string()));
        }
        info!(pattern_id = %id, "Pattern deleted");
        self.reapplier.reapply_all().await
    }

    /// Extraction rows a pattern currently owns.
    pub async fn extracted_data(&self, id: PatternId) -> Result<Vec<ExtractedData>> {
        self.get(id).await?;
        Ok(self.db.extractions_for_pattern(id).await?)
    }

    /// Dry-run a capture pattern against files without persisting anything.
    ///
    /// Unknown file ids and non-matching files map to `None`.
    pub async fn test_pattern(
        &self,
        file_ids: &[FileId],
        capture_pattern: &str,
        template: Option<&str>,
    ) -> Result<BTreeMap<FileId, Option<ExtractedValues>>> {
        let extractor = Extractor::new(capture_pattern, template)?;
        let files = self.db.get_files_by_ids(file_ids).await?;

        Ok(file_ids
            .iter()
            .map(|id| {
                let values = files
                    .iter()
                    .find(|f| f.id == *id)
                    .and_then(|file| extractor.extract(file));
                (*id, values)
            })
            .collect())
    }

    async fn reapply(&self, pattern: Pattern) -> Result<PatternChange> {
        let reapplied = self.reapplier.reapply_all().await?;
        Ok(PatternChange { pattern, reapplied })
    }
}

/// Named capture groups of a capture pattern, in declaration order.
pub fn capture_variables(capture_pattern: &str) -> Result<Vec<String>> {
    Ok(CaptureMatcher::compile(capture_pattern)?.named_groups())
}

fn duplicate_name(err: DbError, name: &str) -> ClearfileError {
    match err {
        DbError::Constraint(_) => ClearfileError::PatternAlreadyExists(name.to_string()),
        other => other.into(),
    }
}
