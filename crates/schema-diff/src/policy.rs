//! Path-based tolerance policy

use crate::diff::{Classifier, DiffContext};
use crate::{Error, Result};
use regex::Regex;
use tracing::trace;

/// Treats differences at matching paths as expected.
///
/// Each pattern is a regular expression matched against the whole
/// dot-joined path, so `classes\..*\.uid` tolerates every class uid but not
/// `classes.x.uid_hint`.
#[derive(Debug, Clone, Default)]
pub struct ToleratedPaths {
    patterns: Vec<Regex>,
}

impl ToleratedPaths {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(&format!("^(?:{pattern})$")).map_err(|e| Error::InvalidPattern {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(path))
    }
}

impl Classifier for ToleratedPaths {
    fn is_expected(&self, context: &DiffContext<'_>) -> bool {
        let path = context.path_string();
        let tolerated = self.matches(&path);
        trace!(path = %path, tolerated, "Classified difference");
        tolerated
    }
}
