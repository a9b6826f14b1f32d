//! JSON-level type names for diagnostics

use serde_json::Value;
use std::fmt;

/// The JSON type of a value, as reported in error messages.
///
/// Integers and floats are told apart because schema identifiers must be
/// integers while JSON itself only has "number".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonType {
    Object,
    Array,
    String,
    Integer,
    Float,
    True,
    False,
    Null,
}

impl JsonType {
    pub fn as_str(self) -> &'static str {
        match self {
            JsonType::Object => "object",
            JsonType::Array => "array",
            JsonType::String => "string",
            JsonType::Integer => "number (integer)",
            JsonType::Float => "number (float)",
            JsonType::True => "true",
            JsonType::False => "false",
            JsonType::Null => "null",
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Return the JSON type of `value`.
pub fn json_type_of(value: &Value) -> JsonType {
    match value {
        Value::Object(_) => JsonType::Object,
        Value::Array(_) => JsonType::Array,
        Value::String(_) => JsonType::String,
        Value::Number(n) if n.is_f64() => JsonType::Float,
        Value::Number(_) => JsonType::Integer,
        Value::Bool(true) => JsonType::True,
        Value::Bool(false) => JsonType::False,
        Value::Null => JsonType::Null,
    }
}

/// Whether a field counts as "no value" for presence checks.
///
/// Absent, `null`, `""`, `[]`, `{}`, numeric zero and `false` are all empty.
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null | Value::Bool(false)) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::Bool(true)) => false,
    }
}
