//! Best-pattern selection

use super::CompiledPattern;
use clearfile_db::{ExtractedValues, FileRecord};
use clearfile_ids::PatternId;

/// The winning pattern for a file and the record it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub pattern_id: PatternId,
    pub values: ExtractedValues,
}

/// Pick the candidate whose record has the most fields.
///
/// Candidates are tried in order and the winner only changes on a strictly
/// larger field count, so the earliest pattern wins ties. A record with no
/// fields never wins.
pub fn select_best(file: &FileRecord, patterns: &[CompiledPattern]) -> Option<Selection> {
    let mut best: Option<Selection> = None;
    let mut best_count = 0usize;

    for pattern in patterns {
        let Some(values) = pattern.extractor.extract(file) else {
            continue;
        };
        let count = values.len();
        tracing::trace!(file_id = %file.id, pattern = %pattern.name, fields = count, "Candidate");

        if count > best_count {
            best_count = count;
            best = Some(Selection {
                pattern_id: pattern.id,
                values,
            });
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{compile_patterns, test_file, test_pattern};
    use serde_json::json;

    #[test]
    fn most_fields_wins() {
        let file = test_file(1, "/docs/report_2021.pdf", 10);
        let patterns = compile_patterns(&[
            test_pattern(1, "one", r"report_(?P<year>\d+)", Some(r#"{"y": "$year:d$"}"#)),
            test_pattern(
                2,
                "two",
                r"(?P<kind>report)_(?P<year>\d+)",
                Some(r#"{"k": "$kind:s$", "y": "$year:d$"}"#),
            ),
        ]);

        let winner = select_best(&file, &patterns).unwrap();
        assert_eq!(winner.pattern_id, PatternId::new(2));
        assert_eq!(winner.values["k"], json!("report"));
    }

    #[test]
    fn first_pattern_wins_ties() {
        let file = test_file(1, "/docs/report_2021.pdf", 10);
        let patterns = compile_patterns(&[
            test_pattern(7, "first", r"report", Some(r#"{"a": "x"}"#)),
            test_pattern(3, "second", r"2021", Some(r#"{"b": "y"}"#)),
        ]);

        assert_eq!(select_best(&file, &patterns).unwrap().pattern_id, PatternId::new(7));
    }

    #[test]
    fn zero_field_records_never_win() {
        let file = test_file(1, "/docs/report_2021.pdf", 10);
        let patterns = compile_patterns(&[test_pattern(1, "empty", r"report", Some("{}"))]);
        assert!(select_best(&file, &patterns).is_none());
    }

    #[test]
    fn no_match_and_no_candidates() {
        let file = test_file(1, "/docs/report_2021.pdf", 10);
        let patterns = compile_patterns(&[test_pattern(1, "miss", r"/nowhere/", None)]);
        assert!(select_best(&file, &patterns).is_none());
        assert!(select_best(&file, &[]).is_none());
    }
}
