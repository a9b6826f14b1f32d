//! Definition sources read from disk

use crate::{Error, Result};
use schema_json::{JObject, Value, json_type_of};
use std::path::{Path, PathBuf};
use tracing::trace;
use walkdir::WalkDir;

/// One parsed definition file and the location it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub location: PathBuf,
    pub object: JObject,
}

impl Source {
    pub fn new(location: impl Into<PathBuf>, object: JObject) -> Self {
        Self {
            location: location.into(),
            object,
        }
    }
}

/// Read a JSON file that must contain an object.
pub fn read_object_file(path: &Path) -> Result<JObject> {
    trace!("Reading schema file: {:?}", path);
    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        location: path.to_path_buf(),
        source,
    })?;

    let value: Value = serde_json::from_str(&content).map_err(|e| Error::Parse {
        location: path.to_path_buf(),
        message: e.to_string(),
    })?;

    match value {
        Value::Object(obj) => Ok(obj),
        other => Err(Error::NotAnObject {
            found: json_type_of(&other),
            location: path.to_path_buf(),
        }),
    }
}

/// Read every `*.json` file under `base/kind`, recursively, in path order.
///
/// Definitions may be organized in subdirectories. A missing `kind`
/// directory yields no sources.
pub fn read_sources(base: &Path, kind: &str) -> Result<Vec<Source>> {
    let dir = base.join(kind);
    if !dir.is_dir() {
        trace!("No {} directory under {:?}", kind, base);
        return Ok(Vec::new());
    }

    let mut sources = Vec::new();
    for entry in WalkDir::new(&dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let location = e.path().map_or_else(|| dir.clone(), Path::to_path_buf);
            Error::Io {
                location,
                source: e.into(),
            }
        })?;

        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
            let object = read_object_file(path)?;
            sources.push(Source::new(path, object));
        }
    }

    Ok(sources)
}
