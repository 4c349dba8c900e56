//! Capture-pattern matching against file paths
//!
//! A capture pattern is searched anywhere in the file's full path. The raw
//! value map is seeded from the capture groups and then extended with the
//! file's own attributes.

use crate::error::{ClearfileError, Result};
use clearfile_db::{ExtractedValues, FileRecord};
use regex::{Captures, Regex};
use serde_json::Value;

/// File attributes appended to every raw match, overwriting same-named captures.
pub const FILE_ATTRIBUTE_KEYS: [&str; 5] = ["filename", "extension", "directory", "full_path", "size"];

/// A compiled capture pattern.
#[derive(Debug, Clone)]
pub struct CaptureMatcher {
    regex: Regex,
}

/// A successful match: the regex captures plus the raw value map.
pub struct PathMatch<'f> {
    pub captures: Captures<'f>,
    pub raw: ExtractedValues,
}

impl CaptureMatcher {
    /// Compile a capture pattern.
    pub fn compile(capture_pattern: &str) -> Result<Self> {
        let regex = Regex::new(capture_pattern).map_err(|e| ClearfileError::InvalidPattern {
            pattern: capture_pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Named groups in declaration order.
    pub fn named_groups(&self) -> Vec<String> {
        self.regex
            .capture_names()
            .flatten()
            .map(str::to_string)
            .collect()
    }

    /// Search the pattern in the file's full path. `None` means no match.
    pub fn match_file<'f>(&self, file: &'f FileRecord) -> Option<PathMatch<'f>> {
        let captures = self.regex.captures(&file.full_path)?;
        let mut raw = ExtractedValues::new();

        let named: Vec<&str> = self.regex.capture_names().flatten().collect();
        if named.is_empty() {
            // Group 0 is the whole match; positional keys start at the first real group.
            for (index, group) in captures.iter().skip(1).enumerate() {
                raw.insert(format!("group_{}", index), group_value(group.map(|m| m.as_str())));
            }
        } else {
            for name in named {
                raw.insert(name.to_string(), group_value(captures.name(name).map(|m| m.as_str())));
            }
        }

        insert_file_attributes(&mut raw, file);

        Some(PathMatch { captures, raw })
    }
}

fn group_value(captured: Option<&str>) -> Value {
    captured.map_or(Value::Null, |s| Value::String(s.to_string()))
}

fn insert_file_attributes(raw: &mut ExtractedValues, file: &FileRecord) {
    raw.insert("filename".to_string(), Value::String(file.filename.clone()));
    raw.insert("extension".to_string(), Value::String(file.extension.clone()));
    raw.insert("directory".to_string(), Value::String(file.directory.clone()));
    raw.insert("full_path".to_string(), Value::String(file.full_path.clone()));
    raw.insert("size".to_string(), Value::from(file.size));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::test_file;
    use serde_json::json;

    #[test]
    fn named_groups_and_file_attributes() {
        let file = test_file(1, "/docs/report_2021.pdf", 2048);
        let matcher = CaptureMatcher::compile(r"report_(?P<year>\d+)\.pdf").unwrap();

        let m = matcher.match_file(&file).unwrap();
        assert_eq!(
            Value::Object(m.raw),
            json!({
                "year": "2021",
                "filename": "report_2021",
                "extension": "pdf",
                "directory": "/docs",
                "full_path": "/docs/report_2021.pdf",
                "size": 2048
            })
        );
    }

    #[test]
    fn positional_groups_are_zero_based() {
        let file = test_file(1, "/path/to/docs/document.pdf", 1024);
        let matcher = CaptureMatcher::compile(r"/path/to/docs/(\w+)\.(\w+)").unwrap();

        let m = matcher.match_file(&file).unwrap();
        assert_eq!(m.raw["group_0"], json!("document"));
        assert_eq!(m.raw["group_1"], json!("pdf"));
        assert!(!m.raw.contains_key("group_2"));
    }

    #[test]
    fn named_groups_hide_positional_ones() {
        let file = test_file(1, "/a/b_c.txt", 1);
        let matcher = CaptureMatcher::compile(r"(?P<first>\w)_(\w)").unwrap();

        let m = matcher.match_file(&file).unwrap();
        assert_eq!(m.raw["first"], json!("b"));
        assert!(!m.raw.contains_key("group_0"));
        assert!(!m.raw.contains_key("group_1"));
    }

    #[test]
    fn unmatched_optional_group_is_null() {
        let file = test_file(1, "/a/report.pdf", 1);
        let matcher = CaptureMatcher::compile(r"report(?P<suffix>_\d+)?\.pdf").unwrap();

        let m = matcher.match_file(&file).unwrap();
        assert_eq!(m.raw["suffix"], Value::Null);
    }

    #[test]
    fn file_attributes_overwrite_captures() {
        let file = test_file(1, "/a/report.pdf", 1);
        let matcher = CaptureMatcher::compile(r"/a/(?P<filename>\w+)(?P<size>\.pdf)").unwrap();

        let m = matcher.match_file(&file).unwrap();
        assert_eq!(m.raw["filename"], json!("report"));
        assert_eq!(m.raw["size"], json!(1));
    }

    #[test]
    fn no_match_and_groupless_match() {
        let file = test_file(1, "/path/to/docs/document.pdf", 1);

        let miss = CaptureMatcher::compile(r"/non/matching/path/").unwrap();
        assert!(miss.match_file(&file).is_none());

        let literal = CaptureMatcher::compile(r"document\.pdf").unwrap();
        let m = literal.match_file(&file).unwrap();
        assert_eq!(m.raw.len(), FILE_ATTRIBUTE_KEYS.len());
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = CaptureMatcher::compile("report_(").unwrap_err();
        assert!(matches!(err, ClearfileError::InvalidPattern { .. }));
    }

    #[test]
    fn named_groups_listing() {
        let matcher = CaptureMatcher::compile(r"(?P<a>\d+)-(\w+)-(?P<b>\w+)").unwrap();
        assert_eq!(matcher.named_groups(), vec!["a", "b"]);
    }
}
