//! Recursive tree diff

use schema_json::{JObject, Value};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// One side of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// One side of a difference
#[derive(Debug, Clone, PartialEq)]
pub enum DiffValue {
    /// The key does not exist on this side.
    Missing,
    /// Both sides are objects with different key sets; `keys` are present on
    /// this side but not in the `other` object.
    KeySet { keys: Vec<String>, other: Side },
    /// A value that differs from the other side.
    Value(Value),
}

/// A discrepancy between two trees at one path
#[derive(Debug, Clone, PartialEq)]
pub struct Difference {
    pub is_expected: bool,
    pub path: Vec<String>,
    pub left: DiffValue,
    pub right: DiffValue,
}

impl Difference {
    /// The path joined with dots, e.g. `classes.process_activity.uid`.
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }
}

/// What a classifier sees for each difference
#[derive(Debug, Clone, Copy)]
pub struct DiffContext<'a> {
    /// Last key of the path.
    pub key: &'a str,
    pub path: &'a [String],
    /// Left object holding `key`.
    pub left_parent: &'a JObject,
    /// Right object holding `key`.
    pub right_parent: &'a JObject,
    pub left: &'a DiffValue,
    pub right: &'a DiffValue,
}

impl DiffContext<'_> {
    pub fn path_string(&self) -> String {
        self.path.join(".")
    }
}

/// Decides whether a difference is expected (tolerated)
pub trait Classifier {
    fn is_expected(&self, context: &DiffContext<'_>) -> bool;
}

impl<F> Classifier for F
where
    F: Fn(&DiffContext<'_>) -> bool,
{
    fn is_expected(&self, context: &DiffContext<'_>) -> bool {
        self(context)
    }
}

/// Result of comparing two trees
#[derive(Debug, Clone, PartialEq)]
pub struct DiffOutcome {
    /// True when no difference is unexpected.
    pub ok: bool,
    /// Differences in sorted path order.
    pub differences: Vec<Difference>,
}

impl DiffOutcome {
    pub fn unexpected(&self) -> impl Iterator<Item = &Difference> {
        self.differences.iter().filter(|d| !d.is_expected)
    }

    pub fn expected(&self) -> impl Iterator<Item = &Difference> {
        self.differences.iter().filter(|d| d.is_expected)
    }

    /// Whether the trees compared equal.
    pub fn is_identical(&self) -> bool {
        self.differences.is_empty()
    }
}

/// Compare two objects recursively.
///
/// Keys are visited in sorted order at every level, so the same inputs
/// always yield the same difference list. Without a classifier every
/// difference is unexpected.
pub fn diff_objects(
    left: &JObject,
    right: &JObject,
    classifier: Option<&dyn Classifier>,
) -> DiffOutcome {
    let mut differences = Vec::new();
    let mut path = Vec::new();
    walk(left, right, classifier, &mut path, &mut differences);

    let ok = differences.iter().all(|d| d.is_expected);
    debug!(differences = differences.len(), ok, "Compared trees");
    DiffOutcome { ok, differences }
}

fn walk(
    left: &JObject,
    right: &JObject,
    classifier: Option<&dyn Classifier>,
    path: &mut Vec<String>,
    differences: &mut Vec<Difference>,
) {
    let keys: BTreeSet<&String> = left.keys().chain(right.keys()).collect();

    for key in keys {
        path.push(key.clone());
        match (left.get(key), right.get(key)) {
            (Some(Value::Object(left_obj)), Some(Value::Object(right_obj))) => {
                match key_set_difference(left_obj, right_obj) {
                    None => walk(left_obj, right_obj, classifier, path, differences),
                    Some((left_dv, right_dv)) => {
                        record(key, path, left, right, left_dv, right_dv, classifier, differences);
                    }
                }
            }
            (left_value, right_value) => {
                let equal = match (left_value, right_value) {
                    (Some(l), Some(r)) => values_equal(l, r),
                    _ => false,
                };
                if !equal {
                    record(
                        key,
                        path,
                        left,
                        right,
                        to_diff_value(left_value),
                        to_diff_value(right_value),
                        classifier,
                        differences,
                    );
                }
            }
        }
        path.pop();
    }
}

#[allow(clippy::too_many_arguments)]
fn record(
    key: &str,
    path: &[String],
    left_parent: &JObject,
    right_parent: &JObject,
    left: DiffValue,
    right: DiffValue,
    classifier: Option<&dyn Classifier>,
    differences: &mut Vec<Difference>,
) {
    let is_expected = classifier.is_some_and(|c| {
        c.is_expected(&DiffContext {
            key,
            path,
            left_parent,
            right_parent,
            left: &left,
            right: &right,
        })
    });
    differences.push(Difference {
        is_expected,
        path: path.to_vec(),
        left,
        right,
    });
}

fn to_diff_value(value: Option<&Value>) -> DiffValue {
    value.map_or(DiffValue::Missing, |v| DiffValue::Value(v.clone()))
}

fn key_set_difference(left: &JObject, right: &JObject) -> Option<(DiffValue, DiffValue)> {
    let left_only: Vec<String> = left
        .keys()
        .filter(|k| !right.contains_key(k.as_str()))
        .cloned()
        .collect();
    let right_only: Vec<String> = right
        .keys()
        .filter(|k| !left.contains_key(k.as_str()))
        .cloned()
        .collect();

    if left_only.is_empty() && right_only.is_empty() {
        return None;
    }
    Some((
        DiffValue::KeySet {
            keys: left_only,
            other: Side::Right,
        },
        DiffValue::KeySet {
            keys: right_only,
            other: Side::Left,
        },
    ))
}

/// Deep value equality; numbers compare by value, so `1` equals `1.0`.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => {
            if let (Some(a), Some(b)) = (l.as_i64(), r.as_i64()) {
                a == b
            } else if let (Some(a), Some(b)) = (l.as_u64(), r.as_u64()) {
                a == b
            } else {
                l.as_f64() == r.as_f64()
            }
        }
        (Value::Array(l), Value::Array(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(l), Value::Object(r)) => {
            l.len() == r.len()
                && l
                    .iter()
                    .all(|(k, a)| r.get(k).is_some_and(|b| values_equal(a, b)))
        }
        _ => left == right,
    }
}
