//! Shape guards for dynamically-typed schema trees
//!
//! Each guard narrows a [`Value`] to the expected shape or fails with a
//! [`Error::Shape`] naming the JSON type actually encountered. The `_opt`
//! variants also accept an absent value or JSON `null`.

use crate::{Error, JArray, JObject, Result};
use serde_json::Value;

/// Ensure `value` is an object.
pub fn object(value: &Value) -> Result<&JObject> {
    value.as_object().ok_or_else(|| Error::shape("object", value))
}

/// Ensure `value` is an object, returning it mutably.
pub fn object_mut(value: &mut Value) -> Result<&mut JObject> {
    match value {
        Value::Object(obj) => Ok(obj),
        other => Err(Error::shape("object", other)),
    }
}

/// Ensure `value` is an object, null, or absent.
pub fn object_opt(value: Option<&Value>) -> Result<Option<&JObject>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => object(v).map(Some),
    }
}

/// Ensure `value` is an array.
pub fn array(value: &Value) -> Result<&JArray> {
    value.as_array().ok_or_else(|| Error::shape("array", value))
}

/// Ensure `value` is an array, null, or absent.
pub fn array_opt(value: Option<&Value>) -> Result<Option<&JArray>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => array(v).map(Some),
    }
}

/// Ensure `value` is a string.
pub fn string(value: &Value) -> Result<&str> {
    value.as_str().ok_or_else(|| Error::shape("string", value))
}

/// Ensure `value` is a string, null, or absent.
pub fn string_opt(value: Option<&Value>) -> Result<Option<&str>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => string(v).map(Some),
    }
}

/// Ensure `value` is an integer number that fits in an `i64`.
pub fn integer(value: &Value) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| Error::shape("integer number", value))
}

/// Ensure `value` is an integer number, null, or absent.
pub fn integer_opt(value: Option<&Value>) -> Result<Option<i64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => integer(v).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JsonType;
    use serde_json::json;

    #[test]
    fn test_object_guard() {
        let value = json!({"name": "process"});
        assert_eq!(object(&value).unwrap()["name"], "process");

        let err = object(&json!([1, 2])).unwrap_err();
        assert_eq!(err.found(), Some(JsonType::Array));
        assert_eq!(err.to_string(), "expected object but got array: [1,2]");
    }

    #[test]
    fn test_object_mut_guard() {
        let mut value = json!({"a": 1});
        object_mut(&mut value)
            .unwrap()
            .insert("b".to_string(), json!(2));
        assert_eq!(value, json!({"a": 1, "b": 2}));

        let mut not_object = json!("text");
        let err = object_mut(&mut not_object).unwrap_err();
        assert_eq!(err.found(), Some(JsonType::String));
    }

    #[test]
    fn test_optional_guards_accept_absent_and_null() {
        assert!(object_opt(None).unwrap().is_none());
        assert!(object_opt(Some(&Value::Null)).unwrap().is_none());
        assert!(array_opt(None).unwrap().is_none());
        assert!(string_opt(Some(&Value::Null)).unwrap().is_none());
        assert!(integer_opt(None).unwrap().is_none());
    }

    #[test]
    fn test_optional_guards_reject_wrong_shape() {
        let err = object_opt(Some(&json!(true))).unwrap_err();
        assert_eq!(err.found(), Some(JsonType::True));

        let err = string_opt(Some(&json!(12))).unwrap_err();
        assert_eq!(err.found(), Some(JsonType::Integer));
        assert_eq!(err.to_string(), "expected string but got number (integer): 12");
    }

    #[test]
    fn test_array_guard() {
        assert_eq!(array(&json!([1, "a"])).unwrap().len(), 2);
        let err = array(&json!({})).unwrap_err();
        assert_eq!(err.found(), Some(JsonType::Object));
    }

    #[test]
    fn test_integer_guard() {
        assert_eq!(integer(&json!(42)).unwrap(), 42);
        assert_eq!(integer(&json!(-3)).unwrap(), -3);

        let err = integer(&json!(4.5)).unwrap_err();
        assert_eq!(err.found(), Some(JsonType::Float));
        assert_eq!(
            err.to_string(),
            "expected integer number but got number (float): 4.5"
        );

        let err = integer(&Value::Null).unwrap_err();
        assert_eq!(err.found(), Some(JsonType::Null));
    }

    #[test]
    fn test_string_guard() {
        assert_eq!(string(&json!("win")).unwrap(), "win");
        let err = string(&json!(false)).unwrap_err();
        assert_eq!(err.found(), Some(JsonType::False));
    }
}
