//! Configuration file for `schemac`

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::trace;

/// Errors that can occur when loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {}: {message}", path.display())]
    InvalidFormat { path: PathBuf, message: String },
}

/// Settings shared by all commands; flags given on the command line are
/// added on top of these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Extension directories applied by `resolve`, in order
    pub extensions: Vec<PathBuf>,
    /// Keep hidden classes and objects in `resolve` output
    pub include_hidden: bool,
    /// Path patterns whose differences `diff` treats as expected
    pub tolerated: Vec<String>,
}

impl CliConfig {
    /// Load a config file; `.yaml`/`.yml` files are YAML, anything else JSON.
    ///
    /// Relative extension paths are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        trace!("Loading config from {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = if is_yaml(path) {
            Self::from_yaml(&content)
        } else {
            Self::from_json(&content)
        }
        .map_err(|message| ConfigError::InvalidFormat {
            path: path.to_path_buf(),
            message,
        })?;

        if let Some(dir) = path.parent() {
            for extension in &mut config.extensions {
                if extension.is_relative() {
                    *extension = dir.join(&*extension);
                }
            }
        }
        Ok(config)
    }

    fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("JSON parse error: {e}"))
    }

    fn from_yaml(yaml: &str) -> Result<Self, String> {
        serde_yaml::from_str(yaml).map_err(|e| format!("YAML parse error: {e}"))
    }

    /// Append command-line values after the configured ones.
    pub fn merge_flags(
        mut self,
        extensions: Vec<PathBuf>,
        include_hidden: bool,
        tolerated: Vec<String>,
    ) -> Self {
        self.extensions.extend(extensions);
        self.include_hidden |= include_hidden;
        self.tolerated.extend(tolerated);
        self
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e == "yaml" || e == "yml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config() {
        let config = CliConfig::from_yaml(
            "extensions:\n  - /schemas/win\ninclude_hidden: true\ntolerated:\n  - 'meta\\..*'\n",
        )
        .unwrap();
        assert_eq!(config.extensions, vec![PathBuf::from("/schemas/win")]);
        assert!(config.include_hidden);
        assert_eq!(config.tolerated, vec![r"meta\..*".to_string()]);
    }

    #[test]
    fn test_json_config_defaults() {
        let config = CliConfig::from_json("{}").unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = CliConfig::from_json(r#"{"extension": []}"#).unwrap_err();
        assert!(err.contains("JSON parse error"));
    }

    #[test]
    fn test_load_resolves_relative_extensions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schemac.yml");
        fs::write(&path, "extensions: [win, /abs/linux]\n").unwrap();

        let config = CliConfig::load(&path).unwrap();

        assert_eq!(
            config.extensions,
            vec![dir.path().join("win"), PathBuf::from("/abs/linux")]
        );
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("schemac.json");
        fs::write(&path, "{not json").unwrap();

        let err = CliConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFormat { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = CliConfig::load(Path::new("/nonexistent/schemac.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_merge_flags_appends() {
        let config = CliConfig {
            extensions: vec![PathBuf::from("a")],
            include_hidden: false,
            tolerated: vec!["x".to_string()],
        }
        .merge_flags(vec![PathBuf::from("b")], true, vec!["y".to_string()]);

        assert_eq!(config.extensions, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert!(config.include_hidden);
        assert_eq!(config.tolerated, vec!["x", "y"]);
    }
}
