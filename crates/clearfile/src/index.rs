//! Directory indexing
//!
//! Walks a directory tree and inserts every regular file that is not already
//! indexed. Extraction is not run here; callers reapply patterns afterwards.

use crate::error::{ClearfileError, Result};
use clearfile_db::{Database, NewFile};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSummary {
    pub files_found: u64,
    pub files_added: u64,
    pub already_indexed: u64,
    /// Entries that could not be read and were skipped
    pub skipped: u64,
}

pub struct Indexer {
    db: Database,
    batch_size: usize,
}

impl Indexer {
    pub fn new(db: Database, batch_size: usize) -> Self {
        Self {
            db,
            batch_size: batch_size.max(1),
        }
    }

    /// Index every file under `root`.
    pub async fn index_directory(&self, root: &Path) -> Result<IndexSummary> {
        if !root.is_dir() {
            return Err(ClearfileError::FileOperation(format!(
                "Not a directory: {}",
                root.display()
            )));
        }

        let mut summary = IndexSummary::default();
        let mut batch: Vec<NewFile> = Vec::with_capacity(self.batch_size);

        for entry in walkdir::WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    summary.skipped += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let size = match entry.metadata() {
                Ok(metadata) => metadata.len(),
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Skipping file without metadata");
                    summary.skipped += 1;
                    continue;
                }
            };

            summary.files_found += 1;
            batch.push(NewFile::from_path(entry.path(), size));
            if batch.len() >= self.batch_size {
                self.flush(&mut batch, &mut summary).await?;
            }
        }
        self.flush(&mut batch, &mut summary).await?;

        info!(
            root = %root.display(),
            found = summary.files_found,
            added = summary.files_added,
            existing = summary.already_indexed,
            skipped = summary.skipped,
            "Indexing finished"
        );
        Ok(summary)
    }

    async fn flush(&self, batch: &mut Vec<NewFile>, summary: &mut IndexSummary) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let paths: HashSet<String> = batch.iter().map(|f| f.full_path.clone()).collect();
        let known: HashSet<String> = self
            .db
            .find_files_by_paths(&paths)
            .await?
            .into_iter()
            .map(|f| f.full_path)
            .collect();

        let fresh: Vec<NewFile> = batch
            .drain(..)
            .filter(|f| !known.contains(&f.full_path))
            .collect();
        summary.already_indexed += known.len() as u64;

        let inserted = self.db.insert_files(&fresh).await?;
        summary.files_added += inserted.len() as u64;
        debug!(inserted = inserted.len(), existing = known.len(), "Batch flushed");
        Ok(())
    }
}
