//! Structured item loader
//!
//! Classifies parsed definition sources of one kind into base items and
//! patches, rejecting duplicate names. Patches are returned separately and
//! are never merged here; the caller decides when and onto what to apply
//! them.

use crate::model::{Items, LoadedKind, Locations, caption_of};
use crate::source::Source;
use crate::{Error, Result};
use schema_json::{JObject, Value, is_empty_value, json_type_of};
use std::path::Path;
use tracing::debug;

/// Hook fired once per classified source, with its location.
pub type ItemCallback<'a> = Option<&'a mut dyn FnMut(&Path, &JObject)>;

/// Load items of a kind that never carries patches (e.g. categories).
///
/// Every source must have a non-empty string `name`.
pub fn load_items<I>(sources: I, kind: &str, mut on_item: ItemCallback<'_>) -> Result<Items>
where
    I: IntoIterator<Item = Source>,
{
    let mut items = Items::new();
    let mut locations = Locations::new();

    for Source { location, object } in sources {
        if is_empty_value(object.get("name")) {
            return Err(Error::MissingName {
                kind: kind.to_string(),
                location,
            });
        }
        let name = match string_field(&object, "name", kind, &location)? {
            Some(name) => name,
            None => {
                return Err(Error::MissingName {
                    kind: kind.to_string(),
                    location,
                });
            }
        };

        if let Some(existing) = items.get(&name) {
            return Err(Error::NameCollision {
                kind: kind.to_string(),
                caption: caption_of(&object),
                existing_caption: caption_of(existing),
                existing_location: locations.remove(&name).unwrap_or_default(),
                name,
                location,
            });
        }

        debug!(kind, name = %name, "Loaded item");
        if let Some(callback) = on_item.as_deref_mut() {
            callback(&location, &object);
        }
        locations.insert(name.clone(), location);
        items.insert(name, object);
    }

    Ok(items)
}

/// Load items of a patchable kind (classes, objects), separating patches.
///
/// A source is a patch when it has `extends` and either no `name` or a
/// `name` equal to `extends`. Patches are keyed by their `extends` value.
pub fn load_patchable_items<I>(
    sources: I,
    kind: &str,
    mut on_item: ItemCallback<'_>,
) -> Result<LoadedKind>
where
    I: IntoIterator<Item = Source>,
{
    let mut loaded = LoadedKind::new();

    for Source { location, object } in sources {
        if is_empty_value(object.get("name")) && is_empty_value(object.get("extends")) {
            return Err(Error::MissingNameOrExtends {
                kind: kind.to_string(),
                location,
            });
        }

        let name = string_field(&object, "name", kind, &location)?.filter(|n| !n.is_empty());
        let extends =
            string_field(&object, "extends", kind, &location)?.filter(|e| !e.is_empty());

        match (name, extends) {
            (Some(name), extends) if extends.as_deref() != Some(name.as_str()) => {
                if let Some(existing) = loaded.items.get(&name) {
                    return Err(Error::NameCollision {
                        kind: kind.to_string(),
                        caption: caption_of(&object),
                        existing_caption: caption_of(existing),
                        existing_location: loaded
                            .item_locations
                            .get(&name)
                            .cloned()
                            .unwrap_or_default(),
                        name,
                        location,
                    });
                }

                debug!(kind, name = %name, "Loaded item");
                if let Some(callback) = on_item.as_deref_mut() {
                    callback(&location, &object);
                }
                loaded.item_locations.insert(name.clone(), location);
                loaded.items.insert(name, object);
            }
            (_, Some(target)) => {
                if let Some(existing) = loaded.patches.get(&target) {
                    return Err(Error::PatchCollision {
                        kind: kind.to_string(),
                        caption: caption_of(&object),
                        existing_caption: caption_of(existing),
                        existing_location: loaded
                            .patch_locations
                            .get(&target)
                            .cloned()
                            .unwrap_or_default(),
                        target,
                        location,
                    });
                }

                debug!(kind, target = %target, "Loaded patch");
                if let Some(callback) = on_item.as_deref_mut() {
                    callback(&location, &object);
                }
                loaded.patch_locations.insert(target.clone(), location);
                loaded.patches.insert(target, object);
            }
            (_, None) => {
                return Err(Error::MissingNameOrExtends {
                    kind: kind.to_string(),
                    location,
                });
            }
        }
    }

    Ok(loaded)
}

/// Read an optional string field, rejecting present non-string values.
///
/// Absent and `null` fields read as `None`.
fn string_field(
    object: &JObject,
    field: &'static str,
    kind: &str,
    location: &Path,
) -> Result<Option<String>> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(Error::NonStringField {
            kind: kind.to_string(),
            field,
            found: json_type_of(other),
            location: location.to_path_buf(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schema_json::JsonType;
    use serde_json::json;
    use std::path::PathBuf;

    fn source(location: &str, value: Value) -> Source {
        match value {
            Value::Object(obj) => Source::new(location, obj),
            _ => panic!("test source must be an object"),
        }
    }

    #[test]
    fn test_unique_names_load_as_items() {
        let sources = vec![
            source("classes/a.json", json!({"name": "file_activity"})),
            source("classes/b.json", json!({"name": "process_activity"})),
            source("classes/c.json", json!({"name": "network_activity"})),
        ];

        let loaded = load_patchable_items(sources, "classes", None).unwrap();
        assert_eq!(loaded.items.len(), 3);
        assert!(loaded.patches.is_empty());
        assert!(loaded.items.contains_key("process_activity"));
    }

    #[test]
    fn test_name_collision_names_both_captions() {
        let sources = vec![
            source("objects/a.json", json!({"name": "process", "caption": "Process"})),
            source("objects/b.json", json!({"name": "process", "caption": "Proc"})),
        ];

        let err = load_patchable_items(sources, "objects", None).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, Error::NameCollision { .. }));
        assert!(message.contains("\"Process\""));
        assert!(message.contains("\"Proc\""));
        assert!(message.contains("objects/a.json"));
        assert!(message.contains("objects/b.json"));
    }

    #[test]
    fn test_name_equal_to_extends_is_patch() {
        let sources = vec![source(
            "objects/foo.json",
            json!({"name": "foo", "extends": "foo", "attributes": {}}),
        )];

        let loaded = load_patchable_items(sources, "objects", None).unwrap();
        assert!(loaded.items.is_empty());
        assert!(loaded.patches.contains_key("foo"));
    }

    #[test]
    fn test_extends_without_name_is_patch() {
        let sources = vec![source("objects/p.json", json!({"extends": "process"}))];
        let loaded = load_patchable_items(sources, "objects", None).unwrap();
        assert_eq!(loaded.patches.keys().collect::<Vec<_>>(), vec!["process"]);
    }

    #[test]
    fn test_name_with_different_extends_is_item() {
        let sources = vec![source(
            "classes/p.json",
            json!({"name": "win_process_activity", "extends": "process_activity"}),
        )];
        let loaded = load_patchable_items(sources, "classes", None).unwrap();
        assert!(loaded.items.contains_key("win_process_activity"));
        assert!(loaded.patches.is_empty());
    }

    #[test]
    fn test_empty_name_with_extends_is_patch() {
        let sources = vec![source("objects/p.json", json!({"name": "", "extends": "file"}))];
        let loaded = load_patchable_items(sources, "objects", None).unwrap();
        assert!(loaded.patches.contains_key("file"));
    }

    #[test]
    fn test_missing_name_and_extends_fails() {
        let sources = vec![source("classes/empty.json", json!({"caption": "Nothing"}))];
        let err = load_patchable_items(sources, "classes", None).unwrap_err();
        assert!(matches!(err, Error::MissingNameOrExtends { .. }));
    }

    #[test]
    fn test_empty_values_count_as_missing() {
        for empty in [json!(null), json!(""), json!([]), json!({}), json!(0)] {
            let sources = vec![source(
                "classes/x.json",
                json!({"name": empty.clone(), "extends": empty}),
            )];
            let err = load_patchable_items(sources, "classes", None).unwrap_err();
            assert!(matches!(err, Error::MissingNameOrExtends { .. }));
        }
    }

    #[test]
    fn test_non_string_name_fails() {
        let sources = vec![source("classes/x.json", json!({"name": 12}))];
        let err = load_patchable_items(sources, "classes", None).unwrap_err();
        assert!(matches!(
            err,
            Error::NonStringField {
                field: "name",
                found: JsonType::Integer,
                ..
            }
        ));
    }

    #[test]
    fn test_non_string_extends_fails() {
        let sources = vec![source("classes/x.json", json!({"extends": ["a"]}))];
        let err = load_patchable_items(sources, "classes", None).unwrap_err();
        assert!(matches!(
            err,
            Error::NonStringField {
                field: "extends",
                found: JsonType::Array,
                ..
            }
        ));
    }

    #[test]
    fn test_patch_collision() {
        let sources = vec![
            source("objects/a.json", json!({"extends": "process", "caption": "One"})),
            source("objects/b.json", json!({"name": "process", "extends": "process"})),
        ];

        let err = load_patchable_items(sources, "objects", None).unwrap_err();
        match err {
            Error::PatchCollision {
                target,
                existing_caption,
                existing_location,
                ..
            } => {
                assert_eq!(target, "process");
                assert_eq!(existing_caption, "One");
                assert_eq!(existing_location, PathBuf::from("objects/a.json"));
            }
            e => panic!("Expected PatchCollision error, got {e:?}"),
        }
    }

    #[test]
    fn test_item_and_patch_with_same_name_coexist() {
        let sources = vec![
            source("objects/a.json", json!({"name": "process"})),
            source("objects/b.json", json!({"extends": "process"})),
        ];
        let loaded = load_patchable_items(sources, "objects", None).unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert_eq!(loaded.patches.len(), 1);
        assert_eq!(
            loaded.item_locations["process"],
            PathBuf::from("objects/a.json")
        );
        assert_eq!(
            loaded.patch_locations["process"],
            PathBuf::from("objects/b.json")
        );
    }

    #[test]
    fn test_callback_fires_per_classified_source() {
        let sources = vec![
            source("objects/a.json", json!({"name": "process"})),
            source("objects/b.json", json!({"extends": "file"})),
        ];

        let mut seen: Vec<PathBuf> = Vec::new();
        let mut record = |path: &Path, _obj: &JObject| seen.push(path.to_path_buf());
        load_patchable_items(sources, "objects", Some(&mut record)).unwrap();

        assert_eq!(
            seen,
            vec![
                PathBuf::from("objects/a.json"),
                PathBuf::from("objects/b.json")
            ]
        );
    }

    #[test]
    fn test_load_items_requires_name() {
        let sources = vec![source("categories/x.json", json!({"extends": "system"}))];
        let err = load_items(sources, "categories", None).unwrap_err();
        assert!(matches!(err, Error::MissingName { .. }));
        assert!(err.to_string().contains("categories"));
    }

    #[test]
    fn test_load_items_collision() {
        let sources = vec![
            source("categories/a.json", json!({"name": "system", "caption": "System"})),
            source("categories/b.json", json!({"name": "system", "caption": "Sys"})),
        ];
        let err = load_items(sources, "categories", None).unwrap_err();
        assert!(matches!(err, Error::NameCollision { ref name, .. } if name == "system"));
    }

    #[test]
    fn test_load_items_non_string_name() {
        let sources = vec![source("categories/a.json", json!({"name": true}))];
        let err = load_items(sources, "categories", None).unwrap_err();
        assert!(matches!(err, Error::NonStringField { found: JsonType::True, .. }));
    }

    #[test]
    fn test_load_items_unique() {
        let sources = vec![
            source("categories/a.json", json!({"name": "system", "uid": 1})),
            source("categories/b.json", json!({"name": "network", "uid": 4})),
        ];
        let items = load_items(sources, "categories", None).unwrap();
        assert_eq!(items.len(), 2);
    }
}
