//! Core implementation of tooldeck
//!
//! Tooldeck keeps parameterized command lines in a category → tool → command
//! catalog and runs them in one persistent interactive shell. Templates use
//! `{name}` placeholders that are filled in before the command is written to
//! the shell; the shell is restarted automatically when it exits on its own.

use std::collections::HashSet;

use log::warn;

use crate::commands::catalog::Catalog;
use crate::config_file::{ConfigError, ConfigStore, LoadOutcome};

pub mod commands;
pub mod config_file;
pub mod console;
pub mod external;
pub mod input;
pub mod logger;
pub mod pty;
pub mod remote;
pub mod theme;
pub mod tui;

/// Everything needed to start working with the configured catalog
#[derive(Debug)]
pub struct LoadedCatalog {
    pub catalog: Catalog,
    pub use_internal_terminal: bool,
    pub store: ConfigStore,
    pub outcome: LoadOutcome,
}

/// Load the catalog from `config_file` (or `commands.json` in the working directory).
///
/// A malformed file yields an empty catalog and a `LoadOutcome::Fallback`.
///
/// # Errors
///
/// Returns `ConfigError::Io` if a missing config file cannot be created.
pub fn load_catalog(config_file: Option<&str>) -> Result<LoadedCatalog, ConfigError> {
    let store = ConfigStore::from_arg(config_file);
    let (config, outcome) = store.load()?;
    let (catalog, use_internal_terminal) = config.into_catalog();
    validate_catalog(&catalog);
    Ok(LoadedCatalog {
        catalog,
        use_internal_terminal,
        store,
        outcome,
    })
}

/// Warn about entries that load fine but cannot be used as expected
pub fn validate_catalog(catalog: &Catalog) {
    for category in &catalog.categories {
        if category.tools.is_empty() {
            warn!("Category '{}' has no tools", category.name);
        }
        for tool in &category.tools {
            check_duplicate_names(&category.name, &tool.name, tool.commands.iter().map(|c| c.name.as_str()));
            for command in &tool.commands {
                if command.template.trim().is_empty() {
                    warn!(
                        "Command '{}/{}/{}' has an empty template",
                        category.name, tool.name, command.name
                    );
                }
            }
        }
        check_duplicate_names(&category.name, "", category.tools.iter().map(|t| t.name.as_str()));
    }
}

/// Paths like `category/tool/command` only resolve the first of two equal names
fn check_duplicate_names<'a>(category: &str, tool: &str, names: impl Iterator<Item = &'a str>) {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            let parent = if tool.is_empty() {
                category.to_string()
            } else {
                format!("{category}/{tool}")
            };
            warn!("Duplicate name '{name}' under '{parent}'");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_catalog_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("commands.json");
        std::fs::write(
            &path,
            r#"[{"name": "net", "tools": [{"name": "ping", "commands": [{"name": "once", "template": "ping -c 1 {host}"}]}]}]"#,
        )
        .unwrap();

        let loaded = load_catalog(path.to_str()).unwrap();
        assert!(matches!(loaded.outcome, LoadOutcome::Loaded));
        assert!(loaded.use_internal_terminal);
        assert_eq!(loaded.catalog.command_count(), 1);
        assert_eq!(loaded.store.path(), path);
    }
}
