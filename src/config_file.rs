//! Configuration file handling for tooldeck

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commands::catalog::{Catalog, Category};

/// Default configuration file name, resolved against the working directory
pub const DEFAULT_CONFIG_FILE: &str = "commands.json";

/// Errors that can occur while loading or saving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to access config file {path}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("Unable to parse JSON config {origin}: {source}")]
    Json {
        source: serde_json::Error,
        origin: String,
    },
}

/// On-disk document: either the current object shape or a bare category list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConfigDocument {
    Legacy(Vec<Category>),
    Current {
        #[serde(default)]
        categories: Vec<Category>,
        #[serde(default = "default_internal_terminal")]
        use_internal_terminal: bool,
    },
}

fn default_internal_terminal() -> bool {
    true
}

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConfigDocument")]
pub struct Config {
    pub categories: Vec<Category>,
    pub use_internal_terminal: bool,
}

impl From<ConfigDocument> for Config {
    fn from(document: ConfigDocument) -> Self {
        match document {
            ConfigDocument::Legacy(categories) => Config {
                categories,
                use_internal_terminal: true,
            },
            ConfigDocument::Current {
                categories,
                use_internal_terminal,
            } => Config {
                categories,
                use_internal_terminal,
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            use_internal_terminal: true,
        }
    }
}

impl Config {
    /// Build a config from a catalog and the terminal mode
    #[must_use]
    pub fn from_catalog(catalog: &Catalog, use_internal_terminal: bool) -> Self {
        Self {
            categories: catalog.categories.clone(),
            use_internal_terminal,
        }
    }

    #[must_use]
    pub fn into_catalog(self) -> (Catalog, bool) {
        (Catalog::new(self.categories), self.use_internal_terminal)
    }

    /// Parse a JSON document in either supported shape.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Json` if the text is not a valid configuration.
    pub fn from_json(text: &str, origin: &str) -> Result<Config, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Json {
            source: e,
            origin: origin.to_string(),
        })
    }

    /// Serialize with two-space indentation, keeping non-ASCII text as-is.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Json` if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Json {
            source: e,
            origin: "in-memory config".to_string(),
        })
    }

    /// Loads and parses a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be read, or `ConfigError::Json`
    /// if parsing fails.
    pub fn from_file(file: &Path) -> Result<Config, ConfigError> {
        let contents = std::fs::read_to_string(file).map_err(|e| ConfigError::Io {
            source: e,
            path: file.to_path_buf(),
        })?;
        Self::from_json(&contents, &file.display().to_string())
    }

    /// Write the configuration to `file`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if serialization or writing fails.
    pub fn write_file(&self, file: &Path) -> Result<(), ConfigError> {
        let json = self.to_json()?;
        std::fs::write(file, json).map_err(|e| ConfigError::Io {
            source: e,
            path: file.to_path_buf(),
        })
    }
}

/// How a [`ConfigStore::load`] call obtained its configuration
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded,
    /// No file existed; an empty default was written
    Created,
    /// The file could not be parsed; an empty default is used and the file left alone
    Fallback(ConfigError),
}

/// Owns the location of the persisted configuration
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Resolve `--config` or fall back to `commands.json` in the working directory
    #[must_use]
    pub fn from_arg(config_file: Option<&str>) -> Self {
        Self::new(PathBuf::from(config_file.unwrap_or(DEFAULT_CONFIG_FILE)))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration, never failing: parse errors fall back to the default.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` only when a missing file cannot be created.
    pub fn load(&self) -> Result<(Config, LoadOutcome), ConfigError> {
        if !self.path.exists() {
            info!("Creating new config file: {}", self.path.display());
            let config = Config::default();
            config.write_file(&self.path)?;
            return Ok((config, LoadOutcome::Created));
        }
        debug!("Loading config file: {}", self.path.display());
        match Config::from_file(&self.path) {
            Ok(config) => Ok((config, LoadOutcome::Loaded)),
            Err(e) => {
                warn!("Falling back to default config: {e}");
                Ok((Config::default(), LoadOutcome::Fallback(e)))
            }
        }
    }

    /// # Errors
    ///
    /// Returns `ConfigError` if the file cannot be written.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        debug!("Saving config to {}", self.path.display());
        config.write_file(&self.path)
    }

    /// Read a configuration from `source` and persist it as the current one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `source` cannot be read or parsed, or saving fails.
    pub fn import(&self, source: &Path) -> Result<Config, ConfigError> {
        let config = Config::from_file(source)?;
        self.save(&config)?;
        info!("Imported config from {}", source.display());
        Ok(config)
    }

    /// Write `config` to `target`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if serialization or writing fails.
    pub fn export(config: &Config, target: &Path) -> Result<(), ConfigError> {
        config.write_file(target)?;
        info!("Exported config to {}", target.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::template::ParamKind;

    const CURRENT: &str = r#"{
        "categories": [{
            "name": "文档处理",
            "tools": [{
                "name": "pdftotext",
                "description": "PDF to text",
                "commands": [{
                    "name": "convert",
                    "template": "pdftotext {input} {output}",
                    "param_types": {"input": "文件", "output": "字符串"}
                }]
            }]
        }],
        "use_internal_terminal": false
    }"#;

    #[test]
    fn test_parse_current_shape() {
        let config = Config::from_json(CURRENT, "test").unwrap();
        assert!(!config.use_internal_terminal);
        let cmd = &config.categories[0].tools[0].commands[0];
        assert_eq!(cmd.param_types["input"], ParamKind::File);
        assert_eq!(cmd.param_types["output"], ParamKind::String);
    }

    #[test]
    fn test_parse_legacy_array_defaults_internal_terminal() {
        let config =
            Config::from_json(r#"[{"name": "net", "tools": []}]"#, "legacy").unwrap();
        assert!(config.use_internal_terminal);
        assert_eq!(config.categories[0].name, "net");
    }

    #[test]
    fn test_missing_fields_default() {
        let config = Config::from_json(
            r#"{"categories": [{"name": "c", "tools": [{"name": "t"}]}]}"#,
            "partial",
        )
        .unwrap();
        assert!(config.use_internal_terminal);
        assert!(config.categories[0].tools[0].commands.is_empty());
        assert_eq!(config.categories[0].tools[0].description, "");
    }

    #[test]
    fn test_round_trip_keeps_labels_and_drops_ids() {
        let config = Config::from_json(CURRENT, "test").unwrap();
        let json = config.to_json().unwrap();
        assert!(json.contains("\"文件\""));
        assert!(json.contains("文档处理"));
        assert!(!json.contains("\"id\""));
        assert!(json.contains("\n  \"categories\""));
    }

    #[test]
    fn test_load_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join(DEFAULT_CONFIG_FILE));
        let (config, outcome) = store.load().unwrap();
        assert!(matches!(outcome, LoadOutcome::Created));
        assert_eq!(config, Config::default());
        assert!(store.path().exists());
    }

    #[test]
    fn test_load_malformed_falls_back_without_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "{ not json").unwrap();
        let store = ConfigStore::new(path.clone());
        let (config, outcome) = store.load().unwrap();
        assert!(matches!(outcome, LoadOutcome::Fallback(ConfigError::Json { .. })));
        assert!(config.categories.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }
}
