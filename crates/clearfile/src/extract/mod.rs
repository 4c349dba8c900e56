//! Path-based metadata extraction
//!
//! The pipeline for one file is: [`matcher`] searches a capture pattern in the
//! full path, [`template`] turns the captures into an output record,
//! [`selector`] keeps the richest record across candidate patterns, and
//! [`sync`] persists the outcome. [`reapply`] drives that pipeline over pages
//! of files.

pub mod matcher;
pub mod reapply;
pub mod selector;
pub mod sync;
pub mod template;

pub use matcher::{CaptureMatcher, PathMatch, FILE_ATTRIBUTE_KEYS};
pub use reapply::{FileSelection, ReapplyCancelToken, ReapplyConfig, ReapplySummary, Reapplier};
pub use selector::{select_best, Selection};
pub use sync::{ExtractionSync, FAILURE_REASON};
pub use template::{Template, TemplateSource, TemplateValue, ValueKind};

use crate::error::Result;
use clearfile_db::{ExtractedValues, FileRecord, Pattern};
use clearfile_ids::PatternId;

/// A capture matcher paired with its parsed output template.
#[derive(Debug, Clone)]
pub struct Extractor {
    matcher: CaptureMatcher,
    template: TemplateSource,
}

impl Extractor {
    /// Compile a capture pattern and parse its template.
    ///
    /// Only the capture pattern can fail; a malformed template silently
    /// degrades to raw-capture output.
    pub fn new(capture_pattern: &str, template: Option<&str>) -> Result<Self> {
        Ok(Self {
            matcher: CaptureMatcher::compile(capture_pattern)?,
            template: TemplateSource::from_raw(template),
        })
    }

    pub fn matcher(&self) -> &CaptureMatcher {
        &self.matcher
    }

    pub fn template(&self) -> &TemplateSource {
        &self.template
    }

    /// Extract an output record from a file, `None` when the pattern does not match.
    pub fn extract(&self, file: &FileRecord) -> Option<ExtractedValues> {
        let PathMatch { captures, raw } = self.matcher.match_file(file)?;
        Some(self.template.apply(&captures, raw))
    }
}

/// A stored pattern compiled for repeated use within one run.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub id: PatternId,
    pub name: String,
    pub extractor: Extractor,
}

impl CompiledPattern {
    pub fn compile(pattern: &Pattern) -> Result<Self> {
        Ok(Self {
            id: pattern.id,
            name: pattern.name.clone(),
            extractor: Extractor::new(&pattern.capture_pattern, pattern.template.as_deref())?,
        })
    }
}

/// Compile stored patterns, preserving order. Invalid ones are logged and skipped.
pub fn compile_patterns(patterns: &[Pattern]) -> Vec<CompiledPattern> {
    patterns
        .iter()
        .filter_map(|pattern| match CompiledPattern::compile(pattern) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                tracing::warn!(pattern_id = %pattern.id, name = %pattern.name, error = %e, "Skipping pattern");
                None
            }
        })
        .collect()
}

/// Build an in-memory file row for tests.
#[cfg(test)]
pub(crate) fn test_file(id: i64, path: &str, size: u64) -> FileRecord {
    let new = clearfile_db::NewFile::from_path(std::path::Path::new(path), size);
    let now = chrono::Utc::now();
    FileRecord {
        id: clearfile_ids::FileId::new(id),
        filename: new.filename,
        extension: new.extension,
        directory: new.directory,
        full_path: new.full_path,
        size: new.size,
        extracted_info: ExtractedValues::new(),
        extraction_failed: false,
        extraction_failure_reason: None,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
pub(crate) fn test_pattern(id: i64, name: &str, capture: &str, template: Option<&str>) -> Pattern {
    let now = chrono::Utc::now();
    Pattern {
        id: PatternId::new(id),
        name: name.to_string(),
        capture_pattern: capture.to_string(),
        template: template.map(str::to_string),
        confirmed: false,
        created_at: now,
        updated_at: now,
    }
}
