//! Rename templates
//!
//! A rename template is free text with `{key}` tokens, e.g. `{y}_{filename}`.
//! Each token is replaced by the matching value of a file's extracted info.

use crate::error::{ClearfileError, Result};
use clearfile_db::ExtractedValues;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

/// Default marker substituted for keys the extracted info lacks.
pub const MISSING_PLACEHOLDER: &str = "[NA]";

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(\w+)\}").expect("rename token regex"));

/// What to do with a `{key}` the extracted info does not provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingKeyPolicy<'a> {
    /// Substitute the marker and keep going
    Placeholder(&'a str),
    /// Fail with [`ClearfileError::MissingField`] naming the first missing key
    Fail,
}

/// Render a target file name from a rename template.
///
/// A `null` value counts as missing. The original extension is appended unless
/// the rendered name already ends with it; an empty extension appends nothing.
pub fn render_filename(
    template: &str,
    info: &ExtractedValues,
    extension: &str,
    policy: MissingKeyPolicy<'_>,
) -> Result<String> {
    let mut missing: Option<String> = None;

    let rendered = TOKEN.replace_all(template, |caps: &Captures<'_>| {
        let key = &caps[1];
        match info.get(key).and_then(display_value) {
            Some(text) => text,
            None => match policy {
                MissingKeyPolicy::Placeholder(marker) => marker.to_string(),
                MissingKeyPolicy::Fail => {
                    missing.get_or_insert_with(|| key.to_string());
                    String::new()
                }
            },
        }
    });

    if let Some(key) = missing {
        return Err(ClearfileError::MissingField(key));
    }

    let mut name = rendered.into_owned();
    let extension = extension.trim_start_matches('.');
    if !extension.is_empty() && !name.ends_with(&format!(".{extension}")) {
        name.push('.');
        name.push_str(extension);
    }
    Ok(name)
}

/// The `{key}` names a rename template references, in first-seen order.
pub fn template_keys(template: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for caps in TOKEN.captures_iter(template) {
        let key = &caps[1];
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
    keys
}

fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
