//! Output templates
//!
//! A template is a JSON object mapping an output key to a value spec:
//!
//! - `"$<index>:<type>$"` reads capture group `<index>` (0 is the whole match)
//! - `"$<name>:<type>$"` reads the named capture group `<name>`
//! - anything else is a literal copied verbatim
//!
//! `<type>` is `s` (string) or `d` (integer). Specs are parsed once into
//! [`TemplateValue`] when a pattern is compiled and evaluated per file.

use clearfile_db::ExtractedValues;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

static POSITIONAL_SPEC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$(\d+):([sd])\$$").expect("positional spec regex"));
static NAMED_SPEC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\$([A-Za-z_][A-Za-z0-9_]*):([sd])\$$").expect("named spec regex"));

/// How a captured substring is converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// `s`: verbatim
    Str,
    /// `d`: parsed as an integer, null when not numeric
    Int,
}

impl ValueKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "s" => Some(Self::Str),
            "d" => Some(Self::Int),
            _ => None,
        }
    }

    fn convert(self, captured: Option<&str>) -> Value {
        match (self, captured) {
            (_, None) => Value::Null,
            (Self::Str, Some(s)) => Value::String(s.to_string()),
            (Self::Int, Some(s)) => s.trim().parse::<i64>().map_or(Value::Null, Value::from),
        }
    }
}

/// One parsed template entry.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    Literal(Value),
    Positional { index: usize, kind: ValueKind },
    Named { name: String, kind: ValueKind },
}

impl TemplateValue {
    /// Classify a spec string.
    pub fn parse(spec: &str) -> Self {
        if let Some(caps) = POSITIONAL_SPEC.captures(spec) {
            let kind = ValueKind::from_tag(&caps[2]);
            // An index too large for usize can never name a real group.
            if let (Ok(index), Some(kind)) = (caps[1].parse::<usize>(), kind) {
                return Self::Positional { index, kind };
            }
            if let Some(kind) = kind {
                return Self::Positional {
                    index: usize::MAX,
                    kind,
                };
            }
        }
        if let Some(caps) = NAMED_SPEC.captures(spec) {
            if let Some(kind) = ValueKind::from_tag(&caps[2]) {
                return Self::Named {
                    name: caps[1].to_string(),
                    kind,
                };
            }
        }
        Self::Literal(Value::String(spec.to_string()))
    }

    fn evaluate(&self, captures: &Captures<'_>) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Positional { index, kind } => kind.convert(captures.get(*index).map(|m| m.as_str())),
            Self::Named { name, kind } => kind.convert(captures.name(name).map(|m| m.as_str())),
        }
    }
}

/// A parsed template: ordered output keys with their value specs.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    entries: Vec<(String, TemplateValue)>,
}

impl Template {
    /// Parse a serialized template. Fails unless the input is a JSON object.
    ///
    /// Non-string values are carried through as literals.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        let map: serde_json::Map<String, Value> = serde_json::from_str(raw)?;
        let entries = map
            .into_iter()
            .map(|(key, spec)| {
                let value = match spec {
                    Value::String(s) => TemplateValue::parse(&s),
                    other => TemplateValue::Literal(other),
                };
                (key, value)
            })
            .collect();
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[(String, TemplateValue)] {
        &self.entries
    }

    /// Evaluate every entry. Total: each entry yields exactly one key.
    pub fn evaluate(&self, captures: &Captures<'_>) -> ExtractedValues {
        self.entries
            .iter()
            .map(|(key, value)| (key.clone(), value.evaluate(captures)))
            .collect()
    }
}

/// A pattern's template after parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSource {
    /// No template stored
    Absent,
    /// Stored but unparseable; behaves exactly like [`TemplateSource::Absent`]
    Malformed,
    Parsed(Template),
}

impl TemplateSource {
    pub fn from_raw(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::Absent,
            Some(text) => match Template::parse(text) {
                Ok(template) => Self::Parsed(template),
                Err(e) => {
                    tracing::debug!(error = %e, "Template is not a JSON object, using raw captures");
                    Self::Malformed
                }
            },
        }
    }

    /// Produce the output record: the template's evaluation, or the raw map.
    pub fn apply(&self, captures: &Captures<'_>, raw: ExtractedValues) -> ExtractedValues {
        match self {
            Self::Parsed(template) => template.evaluate(captures),
            Self::Absent | Self::Malformed => raw,
        }
    }
}
