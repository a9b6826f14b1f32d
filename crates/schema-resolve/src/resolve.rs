//! Single-level schema resolution
//!
//! Loads a base schema directory and any number of extension directories,
//! applies extension patches onto their targets, allocates composite UIDs
//! and scopes extension names. Each directory holds `categories/`,
//! `objects/` and `classes/` subdirectories plus an optional
//! `dictionary.json`; an extension directory also holds `extension.json`
//! with the extension's `name` and `uid`.

use crate::loader::{load_items, load_patchable_items};
use crate::merge::deep_merge;
use crate::model::{Items, Locations, caption_of, is_hidden_class, is_hidden_object, item_name};
use crate::requirement::requirement_to_rank;
use crate::scope::{
    ExtensionIndex, extension_of, scope_attributes, scope_dictionary_references,
    scope_item_references, to_extension_scoped_name,
};
use crate::source::{read_object_file, read_sources};
use crate::uid::{
    category_scoped_class_uid, class_uid_scoped_type_uid, extension_scoped_category_uid,
};
use crate::{Error, Result};
use schema_json::{JObject, Value, guard, put_non_null};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CATEGORIES: &str = "categories";
const OBJECTS: &str = "objects";
const CLASSES: &str = "classes";
const DICTIONARY_FILE: &str = "dictionary.json";
const EXTENSION_FILE: &str = "extension.json";

/// Options controlling resolution output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Keep hidden classes and objects in the output
    pub include_hidden: bool,
}

/// A fully resolved schema, keyed by extension-scoped names
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedSchema {
    pub categories: Items,
    pub classes: Items,
    pub objects: Items,
    pub dictionary: JObject,
}

impl ResolvedSchema {
    /// Convert into a single JSON object with one key per kind.
    pub fn into_value(self) -> Value {
        let mut root = JObject::new();
        root.insert(CATEGORIES.to_string(), items_to_value(self.categories));
        root.insert(CLASSES.to_string(), items_to_value(self.classes));
        root.insert("dictionary".to_string(), Value::Object(self.dictionary));
        root.insert(OBJECTS.to_string(), items_to_value(self.objects));
        Value::Object(root)
    }
}

fn items_to_value(items: Items) -> Value {
    Value::Object(
        items
            .into_iter()
            .map(|(name, item)| (name, Value::Object(item)))
            .collect(),
    )
}

/// An extension manifest
#[derive(Debug, Clone, PartialEq, Eq)]
struct Extension {
    name: String,
    uid: i64,
}

impl Extension {
    fn read(dir: &Path) -> Result<Self> {
        let location = dir.join(EXTENSION_FILE);
        let manifest = read_object_file(&location)?;
        let invalid = |message: String| Error::Manifest {
            location: location.clone(),
            message,
        };

        let name = guard::string_opt(manifest.get("name"))
            .map_err(|e| invalid(e.to_string()))?
            .filter(|n| !n.is_empty())
            .ok_or_else(|| invalid("missing \"name\"".to_string()))?
            .to_string();
        let uid = guard::integer_opt(manifest.get("uid"))
            .map_err(|e| invalid(e.to_string()))?
            .ok_or_else(|| invalid("missing \"uid\"".to_string()))?;

        Ok(Self { name, uid })
    }

    fn tag(&self, item: &mut JObject) {
        if !item.contains_key("extension") {
            item.insert("extension".to_string(), Value::String(self.name.clone()));
        }
    }
}

/// A patch waiting for all items to be known
#[derive(Debug)]
struct PendingPatch {
    target: String,
    extension: Option<String>,
    patch: JObject,
    location: PathBuf,
}

/// Key of the item `name` denotes from `extension`: the same extension's
/// item if there is one, otherwise the base item.
fn find_key(items: &Items, name: &str, extension: Option<&str>) -> Option<String> {
    if let Some(extension) = extension {
        let scoped = format!("{extension}/{name}");
        if items.contains_key(&scoped) {
            return Some(scoped);
        }
    }
    items.contains_key(name).then(|| name.to_string())
}

/// Items of one kind combined across the base schema and extensions, keyed
/// by scoped name
#[derive(Debug)]
struct KindSet {
    kind: &'static str,
    items: Items,
    locations: Locations,
    patches: Vec<PendingPatch>,
}

impl KindSet {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            items: Items::new(),
            locations: Locations::new(),
            patches: Vec::new(),
        }
    }

    fn insert(&mut self, name: &str, item: JObject, location: PathBuf) -> Result<()> {
        let key =
            to_extension_scoped_name(name, &item).map_err(|e| e.in_item(self.kind, name))?;
        if let Some(existing) = self.items.get(&key) {
            return Err(Error::NameCollision {
                kind: self.kind.to_string(),
                caption: caption_of(&item),
                existing_caption: caption_of(existing),
                existing_location: self.locations.get(&key).cloned().unwrap_or_default(),
                name: key,
                location,
            });
        }
        self.locations.insert(key.clone(), location);
        self.items.insert(key, item);
        Ok(())
    }

    /// Apply pending patches in load order; extension order decides which
    /// patch wins when several touch the same key.
    ///
    /// Object references inside a patch are scoped from the patch's own
    /// extension before merging, since the merged attributes no longer
    /// record where they came from.
    fn apply_patches(&mut self, objects: &ExtensionIndex) -> Result<()> {
        for PendingPatch {
            target,
            extension,
            mut patch,
            location,
        } in self.patches.drain(..)
        {
            let Some(key) = find_key(&self.items, &target, extension.as_deref()) else {
                return Err(Error::UnknownPatchTarget {
                    kind: self.kind.to_string(),
                    target,
                    location,
                });
            };
            patch.remove("name");
            patch.remove("extends");
            scope_attributes(&mut patch, objects, extension.as_deref())
                .map_err(|e| e.in_item(self.kind, key.as_str()))?;

            if let Some(item) = self.items.get_mut(&key) {
                deep_merge(item, &patch);
            }
            debug!(kind = self.kind, target = %key, "Applied patch from {:?}", location);
        }
        Ok(())
    }
}

/// Resolves a base schema together with its extensions
#[derive(Debug, Clone)]
pub struct SchemaResolver {
    base: PathBuf,
    extensions: Vec<PathBuf>,
    options: ResolveOptions,
}

impl SchemaResolver {
    /// Create a resolver for the base schema at `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            extensions: Vec::new(),
            options: ResolveOptions::default(),
        }
    }

    /// Add an extension directory; extensions are applied in the order added.
    pub fn with_extension(mut self, path: impl Into<PathBuf>) -> Self {
        self.extensions.push(path.into());
        self
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn add_extension(&mut self, path: PathBuf) {
        self.extensions.push(path);
    }

    /// Load, patch, allocate UIDs and scope the whole definition set.
    pub fn resolve(&self) -> Result<ResolvedSchema> {
        info!(
            "Resolving schema {:?} with {} extension(s)",
            self.base,
            self.extensions.len()
        );

        let mut categories = KindSet::new(CATEGORIES);
        let mut objects = KindSet::new(OBJECTS);
        let mut classes = KindSet::new(CLASSES);
        let mut dictionary = JObject::new();
        let mut dictionary_locations = Locations::new();

        self.load_categories(&self.base, None, &mut categories)?;
        self.load_patchable(&self.base, None, &mut objects)?;
        self.load_patchable(&self.base, None, &mut classes)?;
        load_dictionary(&self.base, None, &mut dictionary, &mut dictionary_locations)?;

        for dir in &self.extensions {
            let extension = Extension::read(dir)?;
            info!(
                "Loading extension {} (uid {}) from {:?}",
                extension.name, extension.uid, dir
            );
            self.load_categories(dir, Some(&extension), &mut categories)?;
            self.load_patchable(dir, Some(&extension), &mut objects)?;
            self.load_patchable(dir, Some(&extension), &mut classes)?;
            load_dictionary(
                dir,
                Some(&extension),
                &mut dictionary,
                &mut dictionary_locations,
            )?;
        }

        // Patches never add objects, so the index stays valid after patching.
        let index = ExtensionIndex::new(&objects.items)?;

        objects.apply_patches(&index)?;
        classes.apply_patches(&index)?;

        validate_requirements(&objects.items, OBJECTS)?;
        validate_requirements(&classes.items, CLASSES)?;

        for (key, class) in &mut classes.items {
            assign_class_uid(class, &categories.items)
                .map_err(|e| e.in_item(CLASSES, key.as_str()))?;
        }

        let mut object_items = objects.items;
        let mut class_items = classes.items;
        if !self.options.include_hidden {
            object_items.retain(|key, object| !is_hidden_object(item_name(key, object)));
            class_items.retain(|key, class| !is_hidden_class(item_name(key, class), class));
        }

        scope_item_references(&mut class_items, CLASSES, &index)?;
        scope_item_references(&mut object_items, OBJECTS, &index)?;
        scope_dictionary_references(&mut dictionary, &index)?;

        let resolved = ResolvedSchema {
            categories: categories.items,
            classes: class_items,
            objects: object_items,
            dictionary,
        };

        info!(
            "Resolved {} categories, {} classes, {} objects",
            resolved.categories.len(),
            resolved.classes.len(),
            resolved.objects.len()
        );
        Ok(resolved)
    }

    fn load_categories(
        &self,
        dir: &Path,
        extension: Option<&Extension>,
        set: &mut KindSet,
    ) -> Result<()> {
        let mut locations = Locations::new();
        let mut record = |path: &Path, item: &JObject| {
            if let Some(Value::String(name)) = item.get("name") {
                locations.insert(name.clone(), path.to_path_buf());
            }
        };
        let items = load_items(read_sources(dir, set.kind)?, set.kind, Some(&mut record))?;

        for (name, mut item) in items {
            if let Some(extension) = extension {
                extension.tag(&mut item);
                if let Some(uid) = guard::integer_opt(item.get("uid"))
                    .map_err(|e| Error::from(e).in_item(set.kind, name.as_str()))?
                {
                    let scoped = extension_scoped_category_uid(extension.uid, uid)
                        .map_err(|e| Error::from(e).in_item(set.kind, name.as_str()))?;
                    item.insert("uid".to_string(), Value::from(scoped));
                }
            }
            let location = locations.remove(&name).unwrap_or_default();
            set.insert(&name, item, location)?;
        }
        Ok(())
    }

    fn load_patchable(
        &self,
        dir: &Path,
        extension: Option<&Extension>,
        set: &mut KindSet,
    ) -> Result<()> {
        let mut loaded = load_patchable_items(read_sources(dir, set.kind)?, set.kind, None)?;

        for (target, patch) in loaded.patches {
            let location = loaded.patch_locations.remove(&target).unwrap_or_default();
            if extension.is_none() {
                return Err(Error::PatchInBase {
                    kind: set.kind.to_string(),
                    target,
                    location,
                });
            }
            set.patches.push(PendingPatch {
                target,
                extension: extension.map(|e| e.name.clone()),
                patch,
                location,
            });
        }

        for (name, mut item) in loaded.items {
            if let Some(extension) = extension {
                extension.tag(&mut item);
            }
            let location = loaded.item_locations.remove(&name).unwrap_or_default();
            set.insert(&name, item, location)?;
        }
        Ok(())
    }
}

/// Merge the attributes of `dir/dictionary.json`, if present, into
/// `dictionary`, keyed by scoped attribute name.
fn load_dictionary(
    dir: &Path,
    extension: Option<&Extension>,
    dictionary: &mut JObject,
    locations: &mut Locations,
) -> Result<()> {
    let location = dir.join(DICTIONARY_FILE);
    if !location.is_file() {
        return Ok(());
    }
    let mut source = read_object_file(&location)?;

    let attributes = match source.remove("attributes") {
        None | Some(Value::Null) => JObject::new(),
        Some(Value::Object(attributes)) => attributes,
        Some(other) => {
            return Err(Error::from(schema_json::Error::shape("object", &other))
                .in_item("dictionary", location.display().to_string()));
        }
    };

    if extension.is_none() {
        // base dictionary keeps its remaining top-level keys
        deep_merge(dictionary, &source);
    }

    let target = guard::object_mut(
        dictionary
            .entry("attributes")
            .or_insert_with(|| Value::Object(JObject::new())),
    )?;

    for (name, mut value) in attributes {
        let attribute = guard::object_mut(&mut value)
            .map_err(|e| Error::from(e).in_item("dictionary attribute", name.as_str()))?;
        if let Some(extension) = extension {
            extension.tag(attribute);
        }
        let key = to_extension_scoped_name(&name, attribute)
            .map_err(|e| e.in_item("dictionary attribute", name.as_str()))?;

        if let Some(existing) = target.get(&key) {
            return Err(Error::NameCollision {
                kind: "dictionary attribute".to_string(),
                caption: caption_of(attribute),
                existing_caption: guard::object(existing).map(caption_of).unwrap_or_default(),
                existing_location: locations.get(&key).cloned().unwrap_or_default(),
                name: key,
                location,
            });
        }
        locations.insert(key.clone(), location.clone());
        target.insert(key, value);
    }
    Ok(())
}

fn validate_requirements(items: &Items, kind: &str) -> Result<()> {
    for (name, item) in items {
        validate_attribute_requirements(item).map_err(|e| e.in_item(kind, name.as_str()))?;
    }
    Ok(())
}

fn validate_attribute_requirements(item: &JObject) -> Result<()> {
    let Some(attributes) = guard::object_opt(item.get("attributes"))? else {
        return Ok(());
    };
    for attribute in attributes.values() {
        let attribute = guard::object(attribute)?;
        requirement_to_rank(guard::string_opt(attribute.get("requirement"))?)?;
    }
    Ok(())
}

/// Compose a class's UID with its category's and derive its type UIDs.
///
/// Classes without an integer `uid` or without a known, numbered category
/// are left unchanged.
fn assign_class_uid(class: &mut JObject, categories: &Items) -> Result<()> {
    let Some(uid) = guard::integer_opt(class.get("uid"))? else {
        return Ok(());
    };
    let Some(category_name) = guard::string_opt(class.get("category"))? else {
        return Ok(());
    };
    let Some(category) = find_key(categories, category_name, extension_of(class)?)
        .and_then(|key| categories.get(&key))
    else {
        debug!(category = category_name, "Class category not found, UID left unscoped");
        return Ok(());
    };
    let Some(category_uid) = guard::integer_opt(category.get("uid"))? else {
        return Ok(());
    };

    let class_uid = category_scoped_class_uid(category_uid, uid)?;
    class.insert("category_uid".to_string(), Value::from(category_uid));
    class.insert("uid".to_string(), Value::from(class_uid));

    let caption = caption_of(class);
    if let Some(types) = activity_types(class, class_uid, &caption)? {
        let attributes = guard::object_mut(
            class
                .entry("attributes")
                .or_insert_with(|| Value::Object(JObject::new())),
        )?;
        let type_uid = guard::object_mut(attributes.entry("type_uid").or_insert_with(|| {
            let mut attribute = JObject::new();
            attribute.insert("caption".to_string(), Value::from("Type ID"));
            Value::Object(attribute)
        }))?;
        let mut generated = JObject::new();
        generated.insert("enum".to_string(), Value::Object(types));
        deep_merge(type_uid, &generated);
    }
    Ok(())
}

/// Type UID enum entries derived from a class's `activity_id` enum.
fn activity_types(
    class: &JObject,
    class_uid: i64,
    class_caption: &str,
) -> Result<Option<JObject>> {
    let Some(attributes) = guard::object_opt(class.get("attributes"))? else {
        return Ok(None);
    };
    let Some(activity) = guard::object_opt(attributes.get("activity_id"))? else {
        return Ok(None);
    };
    let Some(activities) = guard::object_opt(activity.get("enum"))? else {
        return Ok(None);
    };

    let mut types = JObject::new();
    for (key, value) in activities {
        let Ok(activity_id) = key.parse::<i64>() else {
            continue;
        };
        let activity = guard::object(value)?;
        let type_uid = class_uid_scoped_type_uid(class_uid, activity_id)?;

        let mut entry = JObject::new();
        entry.insert(
            "caption".to_string(),
            Value::String(format!("{class_caption}: {}", caption_of(activity))),
        );
        put_non_null(&mut entry, "description", activity.get("description").cloned());
        types.insert(type_uid.to_string(), Value::Object(entry));
    }

    Ok((!types.is_empty()).then_some(types))
}
