//! Human-readable rendering of differences

use crate::diff::{DiffOutcome, DiffValue, Difference};
use schema_json::to_inline_string;
use std::fmt;

impl fmt::Display for DiffValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffValue::Missing => f.write_str("missing"),
            DiffValue::KeySet { keys, other } if keys.is_empty() => {
                write!(f, "key(s) not in {other} object: none")
            }
            DiffValue::KeySet { keys, other } => {
                write!(f, "key(s) not in {other} object: {}", keys.join(", "))
            }
            DiffValue::Value(value) => {
                f.write_str(&to_inline_string(value).map_err(|_| fmt::Error)?)
            }
        }
    }
}

impl Difference {
    pub fn kind(&self) -> &'static str {
        if self.is_expected {
            "expected"
        } else {
            "unexpected"
        }
    }

    pub fn formatted_string(&self) -> String {
        format!(
            "Diff at \"{}\" ({}):\n    left  : {}\n    right : {}",
            self.path_string(),
            self.kind(),
            self.left,
            self.right
        )
    }
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formatted_string())
    }
}

/// Render differences one per block, unexpected ones first.
pub fn format_differences(differences: &[Difference]) -> String {
    let (expected, unexpected): (Vec<&Difference>, Vec<&Difference>) =
        differences.iter().partition(|d| d.is_expected);

    unexpected
        .into_iter()
        .chain(expected)
        .map(Difference::formatted_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// One-line count of the outcome, e.g. `2 difference(s): 1 unexpected, 1 expected`.
pub fn summary(outcome: &DiffOutcome) -> String {
    if outcome.is_identical() {
        return "No differences".to_string();
    }
    format!(
        "{} difference(s): {} unexpected, {} expected",
        outcome.differences.len(),
        outcome.unexpected().count(),
        outcome.expected().count()
    )
}
