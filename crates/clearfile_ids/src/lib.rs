//! Shared identifier wrappers for Clearfile.
//!
//! Every persisted entity is keyed by a SQLite rowid. Wrapping the raw `i64`
//! keeps a file id from being passed where a pattern id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error returned when parsing an identifier fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdParseError {
    message: String,
}

impl IdParseError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for IdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for IdParseError {}

macro_rules! define_row_id {
    ($name:ident, $label:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub fn parse(value: &str) -> Result<Self, IdParseError> {
                let raw: i64 = value
                    .trim()
                    .parse()
                    .map_err(|e| IdParseError::new(format!("Invalid {}: {}", $label, e)))?;
                if raw <= 0 {
                    return Err(IdParseError::new(format!(
                        "Invalid {}: must be positive, got {}",
                        $label, raw
                    )));
                }
                Ok(Self(raw))
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

define_row_id!(FileId, "file ID");
define_row_id!(PatternId, "pattern ID");
define_row_id!(ExtractionId, "extraction ID");
define_row_id!(ChangeRequestId, "change request ID");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_positive_integers() {
        assert_eq!(FileId::parse("42").unwrap(), FileId::new(42));
        assert_eq!(" 7 ".parse::<PatternId>().unwrap().get(), 7);
    }

    #[test]
    fn parse_rejects_garbage_and_non_positive() {
        let err = FileId::parse("abc").unwrap_err();
        assert!(err.to_string().contains("file ID"));
        assert!(PatternId::parse("0").is_err());
        assert!(PatternId::parse("-3").is_err());
    }

    #[test]
    fn display_is_the_raw_rowid() {
        assert_eq!(ChangeRequestId::new(12).to_string(), "12");
        assert_eq!(ExtractionId::from(3).get(), 3);
    }
}
