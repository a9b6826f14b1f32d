//! Extension scoping of item names and references
//!
//! Items contributed by an extension are published as `"<extension>/<name>"`
//! so that identically named items from different extensions stay unique.
//! References to such items (an attribute's `object_type`) are rewritten to
//! the same scoped name. Scoping runs in two passes: an [`ExtensionIndex`]
//! is built from the complete objects mapping first, then names and
//! references are rewritten against it.
//!
//! A reference made from inside an extension resolves to that extension's
//! item first and to the base item second.

use crate::model::{Items, item_name};
use crate::{Error, Result};
use schema_json::{JObject, Value, guard};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Return the extension-scoped name of `item`, or `name` when the item does
/// not belong to an extension.
pub fn to_extension_scoped_name(name: &str, item: &JObject) -> Result<String> {
    match guard::string_opt(item.get("extension"))? {
        Some(extension) => Ok(format!("{extension}/{name}")),
        None => Ok(name.to_string()),
    }
}

/// The extension an item or attribute belongs to, if any.
pub fn extension_of(item: &JObject) -> Result<Option<&str>> {
    Ok(guard::string_opt(item.get("extension"))?)
}

/// Scoped names of every known item
#[derive(Debug, Clone, Default)]
pub struct ExtensionIndex {
    scoped: HashSet<String>,
    by_name: HashMap<String, Vec<String>>,
}

impl ExtensionIndex {
    /// Index `items`, keyed either by bare or by scoped name.
    pub fn new(items: &Items) -> Result<Self> {
        let mut index = Self::default();
        for (key, item) in items {
            let name = item_name(key, item);
            let scoped = to_extension_scoped_name(name, item)
                .map_err(|e| e.in_item("item", key.as_str()))?;
            index
                .by_name
                .entry(name.to_string())
                .or_default()
                .push(scoped.clone());
            index.scoped.insert(scoped);
        }
        Ok(index)
    }

    /// Whether `scoped_name` is a known item.
    pub fn contains(&self, scoped_name: &str) -> bool {
        self.scoped.contains(scoped_name)
    }

    /// Resolve a reference to `name` made from `extension` (or from the base
    /// schema when `None`) to the scoped name of the item it denotes.
    ///
    /// The same extension's item wins over the base item. A name only one
    /// other extension defines resolves to that extension's item; names that
    /// are unknown or ambiguous resolve to `None`.
    pub fn resolve(&self, name: &str, extension: Option<&str>) -> Option<String> {
        if let Some(extension) = extension {
            let scoped = format!("{extension}/{name}");
            if self.scoped.contains(&scoped) {
                return Some(scoped);
            }
        }
        if self.scoped.contains(name) {
            return Some(name.to_string());
        }
        match self.by_name.get(name).map(Vec::as_slice) {
            Some([only]) => Some(only.clone()),
            _ => None,
        }
    }
}

/// Rewrite an attribute's `object_type` to the scoped name of the object it
/// references from `extension`.
///
/// Unknown references are left untouched.
pub fn scope_attribute_object_type(
    attribute: &mut JObject,
    index: &ExtensionIndex,
    extension: Option<&str>,
) -> Result<()> {
    let Some(object_type) = guard::string_opt(attribute.get("object_type"))? else {
        return Ok(());
    };

    match index.resolve(object_type, extension) {
        Some(scoped) => {
            if scoped != object_type {
                attribute.insert("object_type".to_string(), Value::String(scoped));
            }
        }
        None => warn!(object_type, "Attribute references unknown object type, left unscoped"),
    }
    Ok(())
}

/// Scope the `object_type` references of every attribute of `item`, as seen
/// from `extension`.
pub fn scope_attributes(
    item: &mut JObject,
    index: &ExtensionIndex,
    extension: Option<&str>,
) -> Result<()> {
    let attributes = match item.get_mut("attributes") {
        None | Some(Value::Null) => return Ok(()),
        Some(value) => guard::object_mut(value)?,
    };
    for attribute in attributes.values_mut() {
        scope_attribute_object_type(guard::object_mut(attribute)?, index, extension)?;
    }
    Ok(())
}

/// Scope the attribute references of items already keyed by scoped name.
///
/// Each item's references resolve from the item's own extension.
pub fn scope_item_references(
    items: &mut Items,
    kind: &str,
    index: &ExtensionIndex,
) -> Result<()> {
    for (key, item) in items.iter_mut() {
        let extension = extension_of(item)
            .map_err(|e| e.in_item(kind, key.as_str()))?
            .map(str::to_string);
        scope_attributes(item, index, extension.as_deref())
            .map_err(|e| e.in_item(kind, key.as_str()))?;
    }
    Ok(())
}

/// Scope the names of `items` and the object references of their attributes.
///
/// Consumes a mapping keyed by bare name and returns it keyed by scoped name.
pub fn scope_items(mut items: Items, kind: &str, index: &ExtensionIndex) -> Result<Items> {
    scope_item_references(&mut items, kind, index)?;

    let mut scoped_items = Items::new();
    for (name, item) in items {
        let scoped_name =
            to_extension_scoped_name(&name, &item).map_err(|e| e.in_item(kind, name.as_str()))?;
        scoped_items.insert(scoped_name, item);
    }
    Ok(scoped_items)
}

/// Scope the references of a dictionary whose attributes are already keyed
/// by scoped name.
pub fn scope_dictionary_references(
    dictionary: &mut JObject,
    index: &ExtensionIndex,
) -> Result<()> {
    let attributes = match dictionary.get_mut("attributes") {
        None | Some(Value::Null) => return Ok(()),
        Some(value) => guard::object_mut(value)?,
    };

    for (name, value) in attributes.iter_mut() {
        let attribute = guard::object_mut(value)
            .map_err(|e| Error::from(e).in_item("dictionary attribute", name.as_str()))?;
        let extension = extension_of(attribute)
            .map_err(|e| e.in_item("dictionary attribute", name.as_str()))?
            .map(str::to_string);
        scope_attribute_object_type(attribute, index, extension.as_deref())
            .map_err(|e| e.in_item("dictionary attribute", name.as_str()))?;
    }
    Ok(())
}

/// Scope an attribute dictionary keyed by bare name, in place.
///
/// Object references are rewritten first, then each attribute is re-keyed
/// by its scoped name.
pub fn scope_dictionary(dictionary: &mut JObject, index: &ExtensionIndex) -> Result<()> {
    scope_dictionary_references(dictionary, index)?;

    let attributes = match dictionary.remove("attributes") {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::Object(attributes)) => attributes,
        Some(other) => return Err(schema_json::Error::shape("object", &other).into()),
    };

    let mut scoped_attributes = JObject::new();
    for (name, value) in attributes {
        let attribute = guard::object(&value)
            .map_err(|e| Error::from(e).in_item("dictionary attribute", name.as_str()))?;
        let scoped_name = to_extension_scoped_name(&name, attribute)
            .map_err(|e| e.in_item("dictionary attribute", name.as_str()))?;
        scoped_attributes.insert(scoped_name, value);
    }

    dictionary.insert("attributes".to_string(), Value::Object(scoped_attributes));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> JObject {
        match value {
            Value::Object(obj) => obj,
            _ => panic!("test value must be an object"),
        }
    }

    fn objects() -> Items {
        let mut items = Items::new();
        items.insert(
            "process".to_string(),
            object(json!({"name": "process", "extension": "win"})),
        );
        items.insert("file".to_string(), object(json!({"name": "file"})));
        items
    }

    /// Objects keyed by scoped name, with `registry_key` in two extensions
    /// and `process` in the base schema and one extension.
    fn scoped_objects() -> Items {
        let mut items = Items::new();
        items.insert("process".to_string(), object(json!({"name": "process"})));
        items.insert(
            "win/process".to_string(),
            object(json!({"name": "process", "extension": "win"})),
        );
        items.insert(
            "win/registry_key".to_string(),
            object(json!({"name": "registry_key", "extension": "win"})),
        );
        items.insert(
            "alt/registry_key".to_string(),
            object(json!({"name": "registry_key", "extension": "alt"})),
        );
        items.insert(
            "win/hive".to_string(),
            object(json!({"name": "hive", "extension": "win"})),
        );
        items
    }

    #[test]
    fn test_scoped_name() {
        let item = object(json!({"extension": "win"}));
        assert_eq!(to_extension_scoped_name("process", &item).unwrap(), "win/process");
        assert_eq!(
            to_extension_scoped_name("file", &JObject::new()).unwrap(),
            "file"
        );
    }

    #[test]
    fn test_scoped_name_rejects_non_string_extension() {
        let item = object(json!({"extension": 3}));
        let err = to_extension_scoped_name("process", &item).unwrap_err();
        assert!(err.is_shape_error());
    }

    #[test]
    fn test_index_from_bare_keys() {
        let index = ExtensionIndex::new(&objects()).unwrap();
        assert!(index.contains("win/process"));
        assert!(index.contains("file"));
        assert!(!index.contains("process"));
        assert_eq!(index.resolve("process", None).as_deref(), Some("win/process"));
        assert_eq!(index.resolve("device", None), None);
    }

    #[test]
    fn test_resolve_prefers_same_extension_then_base() {
        let index = ExtensionIndex::new(&scoped_objects()).unwrap();

        assert_eq!(index.resolve("process", Some("win")).as_deref(), Some("win/process"));
        assert_eq!(index.resolve("process", Some("alt")).as_deref(), Some("process"));
        assert_eq!(index.resolve("process", None).as_deref(), Some("process"));
        assert_eq!(
            index.resolve("registry_key", Some("alt")).as_deref(),
            Some("alt/registry_key")
        );
    }

    #[test]
    fn test_resolve_unique_and_ambiguous_names() {
        let index = ExtensionIndex::new(&scoped_objects()).unwrap();

        assert_eq!(index.resolve("hive", None).as_deref(), Some("win/hive"));
        assert_eq!(index.resolve("registry_key", None), None);
        assert_eq!(index.resolve("registry_key", Some("linux")), None);
    }

    #[test]
    fn test_resolve_already_scoped_reference() {
        let index = ExtensionIndex::new(&scoped_objects()).unwrap();
        assert_eq!(
            index.resolve("win/registry_key", Some("alt")).as_deref(),
            Some("win/registry_key")
        );
    }

    #[test]
    fn test_object_type_rewritten_for_extension_object() {
        let index = ExtensionIndex::new(&objects()).unwrap();
        let mut attribute = object(json!({"object_type": "process"}));
        scope_attribute_object_type(&mut attribute, &index, Some("win")).unwrap();
        assert_eq!(attribute["object_type"], "win/process");
    }

    #[test]
    fn test_object_type_kept_for_base_and_unknown_objects() {
        let index = ExtensionIndex::new(&scoped_objects()).unwrap();

        let mut base = object(json!({"object_type": "process"}));
        scope_attribute_object_type(&mut base, &index, None).unwrap();
        assert_eq!(base["object_type"], "process");

        let mut unknown = object(json!({"object_type": "device"}));
        scope_attribute_object_type(&mut unknown, &index, Some("win")).unwrap();
        assert_eq!(unknown["object_type"], "device");
    }

    #[test]
    fn test_scope_items() {
        let index = ExtensionIndex::new(&objects()).unwrap();
        let mut classes = Items::new();
        classes.insert(
            "process_activity".to_string(),
            object(json!({
                "name": "process_activity",
                "extension": "win",
                "attributes": {
                    "process": {"object_type": "process"},
                    "file": {"object_type": "file"},
                    "count": {"type": "integer_t"}
                }
            })),
        );
        classes.insert("base_event".to_string(), object(json!({"name": "base_event"})));

        let scoped = scope_items(classes, "classes", &index).unwrap();

        let keys: Vec<&String> = scoped.keys().collect();
        assert_eq!(keys, vec!["base_event", "win/process_activity"]);
        let attributes = &scoped["win/process_activity"]["attributes"];
        assert_eq!(attributes["process"]["object_type"], "win/process");
        assert_eq!(attributes["file"]["object_type"], "file");
    }

    #[test]
    fn test_scope_item_references_uses_each_items_extension() {
        let index = ExtensionIndex::new(&scoped_objects()).unwrap();
        let mut classes = Items::new();
        classes.insert(
            "win/registry_activity".to_string(),
            object(json!({
                "name": "registry_activity",
                "extension": "win",
                "attributes": {"key": {"object_type": "registry_key"}}
            })),
        );
        classes.insert(
            "alt/registry_activity".to_string(),
            object(json!({
                "name": "registry_activity",
                "extension": "alt",
                "attributes": {"key": {"object_type": "registry_key"}}
            })),
        );

        scope_item_references(&mut classes, "classes", &index).unwrap();

        assert_eq!(
            classes["win/registry_activity"]["attributes"]["key"]["object_type"],
            "win/registry_key"
        );
        assert_eq!(
            classes["alt/registry_activity"]["attributes"]["key"]["object_type"],
            "alt/registry_key"
        );
    }

    #[test]
    fn test_scope_items_rejects_malformed_attributes() {
        let index = ExtensionIndex::default();
        let mut classes = Items::new();
        classes.insert(
            "bad".to_string(),
            object(json!({"attributes": {"pid": "not an object"}})),
        );

        let err = scope_items(classes, "classes", &index).unwrap_err();
        assert!(err.is_shape_error());
        assert!(err.to_string().contains("Invalid classes \"bad\""));
    }

    #[test]
    fn test_scope_dictionary() {
        let index = ExtensionIndex::new(&objects()).unwrap();
        let mut dictionary = object(json!({
            "caption": "Attribute Dictionary",
            "attributes": {
                "pid": {"type": "integer_t"},
                "win_process": {"object_type": "process", "extension": "win"},
                "parent": {"object_type": "process"}
            }
        }));

        scope_dictionary(&mut dictionary, &index).unwrap();

        let attributes = dictionary["attributes"].as_object().unwrap();
        let keys: Vec<&String> = attributes.keys().collect();
        assert_eq!(keys, vec!["parent", "pid", "win/win_process"]);
        assert_eq!(attributes["parent"]["object_type"], "win/process");
        assert_eq!(attributes["win/win_process"]["object_type"], "win/process");
        assert_eq!(dictionary["caption"], "Attribute Dictionary");
    }

    #[test]
    fn test_scope_dictionary_references_keeps_keys() {
        let index = ExtensionIndex::new(&scoped_objects()).unwrap();
        let mut dictionary = object(json!({
            "attributes": {
                "win/reg_key": {"object_type": "registry_key", "extension": "win"},
                "alt/reg_key": {"object_type": "registry_key", "extension": "alt"}
            }
        }));

        scope_dictionary_references(&mut dictionary, &index).unwrap();

        let attributes = &dictionary["attributes"];
        assert_eq!(attributes["win/reg_key"]["object_type"], "win/registry_key");
        assert_eq!(attributes["alt/reg_key"]["object_type"], "alt/registry_key");
    }

    #[test]
    fn test_scope_dictionary_without_attributes() {
        let index = ExtensionIndex::default();
        let mut dictionary = object(json!({"caption": "Empty"}));
        scope_dictionary(&mut dictionary, &index).unwrap();
        assert!(!dictionary.contains_key("attributes"));
    }
}
