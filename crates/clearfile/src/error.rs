//! Error types for the extraction engine

use clearfile_db::DbError;
use clearfile_ids::FileId;
use thiserror::Error;

/// Engine error type
///
/// "No match" is never an error: it is `None` in every extraction API.
#[derive(Error, Debug)]
pub enum ClearfileError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(FileId),

    #[error("Pattern not found: {0}")]
    PatternNotFound(String),

    #[error("No patterns to apply")]
    NoPatterns,

    #[error("Pattern name already exists: {0}")]
    PatternAlreadyExists(String),

    #[error("Invalid capture pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Extraction failed for file {file_id}: {reason}")]
    ExtractionFailed { file_id: FileId, reason: String },

    #[error("Missing extracted field required by rename template: {0}")]
    MissingField(String),

    #[error("File operation failed: {0}")]
    FileOperation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, ClearfileError>;
