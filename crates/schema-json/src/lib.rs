#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # schema-json
//!
//! JSON value vocabulary shared by the schema resolver crates.
//!
//! Schema definitions are kept as dynamically-typed `serde_json` trees. This
//! crate names the JSON-level types of those trees and provides guards that
//! narrow a [`Value`] to an expected shape, failing with a precise
//! description of what was actually found.

/// Shape guards narrowing values to objects, arrays, strings and integers.
pub mod guard;
/// Pretty encoding and small object helpers.
pub mod pretty;
/// JSON-level type names and "no value" detection.
pub mod types;

pub use pretty::{put_non_null, to_inline_string, to_pretty_string};
pub use serde_json::Value;
pub use types::{JsonType, is_empty_value, json_type_of};

use thiserror::Error;

/// A JSON object, the shape of every structured schema item.
pub type JObject = serde_json::Map<String, Value>;

/// A JSON array.
pub type JArray = Vec<Value>;

/// Errors raised when a value does not have the required shape
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("expected {expected} but got {found}: {value}")]
    Shape {
        expected: &'static str,
        found: JsonType,
        value: String,
    },

    #[error("JSON encoding error: {0}")]
    Encode(String),
}

impl Error {
    /// Build a shape error for `value`, recording its actual JSON type.
    pub fn shape(expected: &'static str, value: &Value) -> Self {
        Self::Shape {
            expected,
            found: json_type_of(value),
            value: value.to_string(),
        }
    }

    /// The JSON type that was found, for shape errors.
    pub fn found(&self) -> Option<JsonType> {
        match self {
            Self::Shape { found, .. } => Some(*found),
            Self::Encode(_) => None,
        }
    }
}

/// Crate-local result type for guard operations.
pub type Result<T> = std::result::Result<T, Error>;
