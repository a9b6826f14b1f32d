//! # schema-resolve
//!
//! Structured item loading, patch merging, extension scoping and UID
//! allocation for schema definition sets.
//!
//! A schema is a base taxonomy of categories, classes and objects plus zero
//! or more extensions. Extensions contribute new items and patches onto
//! existing ones; resolution merges the patches, scopes extension names so
//! they stay unique, and derives composite UIDs.

pub mod loader;
pub mod merge;
pub mod model;
pub mod requirement;
pub mod resolve;
pub mod scope;
pub mod source;
pub mod uid;

pub use loader::{load_items, load_patchable_items};
pub use merge::deep_merge;
pub use model::{
    Items, LoadedKind, Locations, Patches, is_hidden_class, is_hidden_object, item_name,
};
pub use requirement::{Requirement, rank_to_requirement, requirement_to_rank};
pub use resolve::{ResolveOptions, ResolvedSchema, SchemaResolver};
pub use scope::{
    ExtensionIndex, extension_of, scope_attribute_object_type, scope_attributes, scope_dictionary,
    scope_dictionary_references, scope_item_references, scope_items, to_extension_scoped_name,
};
pub use source::{Source, read_object_file, read_sources};
pub use uid::{
    UidError, category_scoped_class_uid, class_uid_scoped_type_uid, extension_scoped_category_uid,
};

use schema_json::JsonType;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading and resolving schemas
#[derive(Error, Debug)]
pub enum Error {
    #[error("The \"name\" value in {kind} file must have a value: {}", location.display())]
    MissingName { kind: String, location: PathBuf },

    #[error(
        "Extension {kind} file does not have a \"name\" or \"extends\" value: {}",
        location.display()
    )]
    MissingNameOrExtends { kind: String, location: PathBuf },

    #[error(
        "The \"{field}\" value in {kind} file must be a string, but got {found}: {}",
        location.display()
    )]
    NonStringField {
        kind: String,
        field: &'static str,
        found: JsonType,
        location: PathBuf,
    },

    #[error(
        "Collision of \"name\" in {kind} file: \"{name}\" with caption \"{caption}\", \
         collides with {kind} with caption \"{existing_caption}\" (file: {}), file: {}",
        existing_location.display(),
        location.display()
    )]
    NameCollision {
        kind: String,
        name: String,
        caption: String,
        existing_caption: String,
        existing_location: PathBuf,
        location: PathBuf,
    },

    #[error(
        "Collision of patch name (\"extends\" key) in {kind} file: \"{target}\" \
         with caption \"{caption}\", collides with existing {kind} patch with caption \
         \"{existing_caption}\" (file: {}), file: {}",
        existing_location.display(),
        location.display()
    )]
    PatchCollision {
        kind: String,
        target: String,
        caption: String,
        existing_caption: String,
        existing_location: PathBuf,
        location: PathBuf,
    },

    #[error("Patch in {kind} file extends unknown {kind} \"{target}\": {}", location.display())]
    UnknownPatchTarget {
        kind: String,
        target: String,
        location: PathBuf,
    },

    #[error(
        "Base schema {kind} file must not be a patch (extends \"{target}\"): {}",
        location.display()
    )]
    PatchInBase {
        kind: String,
        target: String,
        location: PathBuf,
    },

    #[error("Unknown requirement: \"{0}\"")]
    UnknownRequirement(String),

    #[error("Unknown rank: {0}")]
    UnknownRank(u8),

    #[error("Invalid {kind} \"{name}\": {source}")]
    InvalidItem {
        kind: String,
        name: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Invalid extension manifest {}: {message}", location.display())]
    Manifest { location: PathBuf, message: String },

    #[error(
        "Schema file contains a JSON {found} value, but should contain an object: {}",
        location.display()
    )]
    NotAnObject { found: JsonType, location: PathBuf },

    #[error("IO error reading {}: {source}", location.display())]
    Io {
        location: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parse error in {}: {message}", location.display())]
    Parse { location: PathBuf, message: String },

    #[error(transparent)]
    Shape(#[from] schema_json::Error),

    #[error("UID invariant violated: {0}")]
    Invariant(#[from] UidError),
}

impl Error {
    /// Attach the kind and name of the item being processed to an error.
    pub fn in_item(self, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::InvalidItem {
            kind: kind.into(),
            name: name.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error (or the error it wraps) is a UID invariant violation.
    ///
    /// Invariant violations come from malformed identifier data and are not
    /// recoverable by retrying with the same definitions.
    pub fn is_invariant_violation(&self) -> bool {
        match self {
            Self::Invariant(_) => true,
            Self::InvalidItem { source, .. } => source.is_invariant_violation(),
            _ => false,
        }
    }

    /// Whether this error is a shape (JSON type) failure rather than a schema error.
    pub fn is_shape_error(&self) -> bool {
        match self {
            Self::Shape(_) => true,
            Self::InvalidItem { source, .. } => source.is_shape_error(),
            _ => false,
        }
    }
}

/// Crate-local result type for loading and resolution.
pub type Result<T> = std::result::Result<T, Error>;
