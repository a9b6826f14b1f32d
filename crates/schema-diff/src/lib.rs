#![deny(rust_2018_idioms)]
#![warn(clippy::all)]

//! # schema-diff
//!
//! Semantic comparison of resolved schema trees.
//!
//! The diff engine only observes: it walks two JSON objects and reports every
//! difference as data. Whether a difference is tolerated is decided by a
//! caller-supplied [`Classifier`], such as [`ToleratedPaths`].
//!
//! ## Example Usage
//!
//! ```rust
//! use schema_diff::{DiffContext, diff_objects};
//! use serde_json::json;
//!
//! let left = json!({"a": 1, "b": 2});
//! let right = json!({"a": 1, "b": 3});
//! let (left, right) = (left.as_object().unwrap(), right.as_object().unwrap());
//!
//! let outcome = diff_objects(left, right, None);
//! assert!(!outcome.ok);
//! assert_eq!(outcome.differences[0].path_string(), "b");
//!
//! let allow_b = |ctx: &DiffContext<'_>| ctx.key == "b";
//! let outcome = diff_objects(left, right, Some(&allow_b));
//! assert!(outcome.ok);
//! assert_eq!(outcome.differences.len(), 1);
//! ```

pub mod diff;
pub mod policy;
pub mod reporter;

pub use diff::{
    Classifier, DiffContext, DiffOutcome, DiffValue, Difference, Side, diff_objects, values_equal,
};
pub use policy::ToleratedPaths;
pub use reporter::{format_differences, summary};

use thiserror::Error;

/// Errors that can occur when building diff policies
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid tolerated path pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
