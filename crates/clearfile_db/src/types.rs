//! Row types for every Clearfile table.
//!
//! These types are the single source of truth shared by the engine and the CLI.

use chrono::{DateTime, Utc};
use clearfile_ids::{ChangeRequestId, ExtractionId, FileId, PatternId};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Structured output record produced by a pattern (string-keyed scalars).
pub type ExtractedValues = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Files
// ============================================================================

/// An indexed file and its cached extraction state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: FileId,
    /// Base name without extension
    pub filename: String,
    /// Extension without the leading dot (may be empty)
    pub extension: String,
    /// Parent directory
    pub directory: String,
    pub full_path: String,
    pub size: u64,
    /// Values of the current winning extraction, empty when none
    pub extracted_info: ExtractedValues,
    pub extraction_failed: bool,
    pub extraction_failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    /// Reset the failure markers before a new extraction attempt.
    pub fn clear_failure(&mut self) {
        self.extraction_failed = false;
        self.extraction_failure_reason = None;
    }
}

/// A file discovered on disk, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFile {
    pub filename: String,
    pub extension: String,
    pub directory: String,
    pub full_path: String,
    pub size: u64,
}

impl NewFile {
    /// Split a path into the stored name parts.
    ///
    /// `/docs/report_2021.pdf` becomes filename `report_2021`, extension `pdf`,
    /// directory `/docs`. Dotfiles such as `.bashrc` keep their full name and
    /// get an empty extension.
    pub fn from_path(path: &Path, size: u64) -> Self {
        let filename = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let directory = path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            filename,
            extension,
            directory,
            full_path: path.to_string_lossy().into_owned(),
            size,
        }
    }
}

/// Sortable columns for file listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSortField {
    #[default]
    Id,
    Filename,
    Extension,
    Directory,
    Size,
    CreatedAt,
}

impl FileSortField {
    pub(crate) fn column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Filename => "filename",
            Self::Extension => "extension",
            Self::Directory => "directory",
            Self::Size => "size",
            Self::CreatedAt => "created_at",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "id" => Some(Self::Id),
            "filename" | "name" => Some(Self::Filename),
            "extension" | "ext" => Some(Self::Extension),
            "directory" | "dir" => Some(Self::Directory),
            "size" => Some(Self::Size),
            "created_at" | "created" => Some(Self::CreatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub(crate) fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Paged file listing query.
#[derive(Debug, Clone, Default)]
pub struct FileQuery {
    pub skip: u64,
    pub limit: u64,
    pub sort: FileSortField,
    pub order: SortOrder,
    /// Substring filter on the base name
    pub filename: Option<String>,
}

impl FileQuery {
    /// Page through all files in id order.
    pub fn page(skip: u64, limit: u64) -> Self {
        Self {
            skip,
            limit,
            ..Self::default()
        }
    }
}

// ============================================================================
// Patterns
// ============================================================================

/// A user-authored capture pattern plus its output template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pattern {
    pub id: PatternId,
    /// Unique human-readable name
    pub name: String,
    /// Regular expression searched anywhere in the full path
    pub capture_pattern: String,
    /// Serialized JSON object mapping output key to a value spec
    pub template: Option<String>,
    /// Accepted by the author for repeated reapplication
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A pattern to be inserted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPattern {
    pub name: String,
    pub capture_pattern: String,
    pub template: Option<String>,
    pub confirmed: bool,
}

// ============================================================================
// Extracted data
// ============================================================================

/// The persisted winning extraction of a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedData {
    pub id: ExtractionId,
    pub file_id: FileId,
    pub pattern_id: PatternId,
    pub values: ExtractedValues,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Change requests
// ============================================================================

/// Outcome of copying a single file within a change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetStatus {
    Copied,
    Failed,
}

impl TargetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Copied => "copied",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "copied" => Some(Self::Copied),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequestTarget {
    pub original_file_id: FileId,
    pub new_filename: String,
    pub status: TargetStatus,
    pub message: Option<String>,
}

/// A recorded rename-and-copy run for one pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    pub id: ChangeRequestId,
    pub pattern_id: PatternId,
    pub rename_template: String,
    pub destination_path: String,
    pub status: String,
    pub success_count: u64,
    pub failed_count: u64,
    pub details: String,
    pub targets: Vec<ChangeRequestTarget>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewChangeRequest {
    pub pattern_id: PatternId,
    pub rename_template: String,
    pub destination_path: String,
    pub success_count: u64,
    pub failed_count: u64,
    pub details: String,
    pub targets: Vec<ChangeRequestTarget>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_file_splits_path_parts() {
        let file = NewFile::from_path(Path::new("/docs/report_2021.pdf"), 10);
        assert_eq!(file.filename, "report_2021");
        assert_eq!(file.extension, "pdf");
        assert_eq!(file.directory, "/docs");
        assert_eq!(file.full_path, "/docs/report_2021.pdf");
        assert_eq!(file.size, 10);
    }

    #[test]
    fn new_file_without_extension() {
        let file = NewFile::from_path(Path::new("/etc/.bashrc"), 0);
        assert_eq!(file.filename, ".bashrc");
        assert_eq!(file.extension, "");

        let file = NewFile::from_path(Path::new("/tmp/archive.tar.gz"), 0);
        assert_eq!(file.filename, "archive.tar");
        assert_eq!(file.extension, "gz");
    }

    #[test]
    fn sort_parsing() {
        assert_eq!(FileSortField::parse("NAME"), Some(FileSortField::Filename));
        assert_eq!(FileSortField::parse("bogus"), None);
        assert_eq!(SortOrder::parse("Desc"), Some(SortOrder::Desc));
        assert_eq!(TargetStatus::parse("copied"), Some(TargetStatus::Copied));
    }
}
