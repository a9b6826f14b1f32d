//! Structured item collections

use schema_json::{JObject, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Items of one kind keyed by their `name`, or by scoped name once combined
/// across extensions.
pub type Items = BTreeMap<String, JObject>;

/// Patches of one kind keyed by the name of the item they extend.
pub type Patches = BTreeMap<String, JObject>;

/// Source location of each loaded entry, keyed like its collection.
pub type Locations = BTreeMap<String, PathBuf>;

/// Result of loading the sources of one patchable kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedKind {
    pub items: Items,
    pub patches: Patches,
    pub item_locations: Locations,
    pub patch_locations: Locations,
}

impl LoadedKind {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether neither items nor patches were loaded.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.patches.is_empty()
    }
}

/// Classes without a `uid` are abstract building blocks, except `base_event`.
pub fn is_hidden_class(name: &str, class: &JObject) -> bool {
    name != "base_event" && !class.contains_key("uid")
}

/// Objects whose name starts with an underscore are hidden.
pub fn is_hidden_object(name: &str) -> bool {
    name.starts_with('_')
}

/// Unscoped name of an item stored under `key`: its `name` field when that
/// is a string, otherwise the key itself.
pub fn item_name<'a>(key: &'a str, item: &'a JObject) -> &'a str {
    match item.get("name") {
        Some(Value::String(name)) if !name.is_empty() => name,
        _ => key,
    }
}

/// Caption of an item for diagnostics; empty when the item has none.
pub fn caption_of(item: &JObject) -> String {
    match item.get("caption") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
