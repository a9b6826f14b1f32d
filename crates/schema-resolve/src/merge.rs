//! Deep merge of patches onto items

use schema_json::{JObject, Value};

/// Merge `source` into `destination` in place.
///
/// Keys missing from `destination` are copied in. When both sides hold an
/// object the merge recurses; any other value (scalar, array, or a type
/// mismatch) in `source` replaces the destination value. Arrays are never
/// merged element-wise.
///
/// `source` is only read; values are cloned into `destination`, so the
/// caller may keep using `source` afterwards.
pub fn deep_merge(destination: &mut JObject, source: &JObject) {
    for (key, source_value) in source {
        match (destination.get_mut(key), source_value) {
            (Some(Value::Object(dest_obj)), Value::Object(source_obj)) => {
                deep_merge(dest_obj, source_obj);
            }
            _ => {
                destination.insert(key.clone(), source_value.clone());
            }
        }
    }
}
