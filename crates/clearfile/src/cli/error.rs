//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use clearfile::ClearfileError;
use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// The database could not be opened
    pub fn database_unavailable(path: &Path, reason: impl fmt::Display) -> Self {
        Self::new(format!("Failed to open database: {}", reason))
            .with_context(format!("Database path: {}", path.display()))
            .with_suggestion("TRY: Ensure the directory exists and is writable")
            .with_suggestion("TRY: Point database_path in config.toml at another location")
    }

    /// An id argument did not parse
    pub fn invalid_id(kind: &str, input: &str) -> Self {
        Self::new(format!("Invalid {} id: '{}'", kind, input))
            .with_context("Ids are positive integers")
            .with_suggestion(format!("TRY: List {}s to find the id you want", kind))
    }
}

impl From<ClearfileError> for HelpfulError {
    fn from(err: ClearfileError) -> Self {
        let message = err.to_string();
        match err {
            ClearfileError::FileNotFound(_) => HelpfulError::new(message)
                .with_suggestion("TRY: clearfile files list"),
            ClearfileError::PatternNotFound(_) => HelpfulError::new(message)
                .with_suggestion("TRY: clearfile pattern list"),
            ClearfileError::NoPatterns => HelpfulError::new(message)
                .with_suggestion("TRY: clearfile pattern add <name> <capture-pattern>"),
            ClearfileError::PatternAlreadyExists(name) => HelpfulError::new(message)
                .with_suggestion(format!("TRY: clearfile pattern confirm {} <capture-pattern> to overwrite it", name)),
            ClearfileError::InvalidPattern { .. } => HelpfulError::new(message)
                .with_context("Capture patterns use Rust regex syntax; named groups are written (?P<name>...)"),
            ClearfileError::ExtractionFailed { .. } => HelpfulError::new(message)
                .with_suggestion("TRY: clearfile pattern test <file-id> <capture-pattern> to check a pattern"),
            ClearfileError::Config(_) => HelpfulError::new(message)
                .with_suggestion("TRY: Fix or delete the config file to fall back to defaults"),
            _ => HelpfulError::new(message),
        }
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

/// Print an error as a JSON object on stdout, for `--json` callers.
pub fn print_json_error(err: &anyhow::Error) {
    let payload = serde_json::json!({
        "status": "failed",
        "error": format!("{}", err).trim_end(),
    });
    println!("{}", payload);
}
