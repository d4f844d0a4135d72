use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::template::{self, ParamKind};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CatalogError {
    #[error("No {kind} with id '{id}'")]
    NotFound { kind: &'static str, id: String },
    #[error("{0} name must not be empty")]
    EmptyName(&'static str),
    #[error("Command template must not be empty")]
    EmptyTemplate,
    #[error("No command at path '{0}' (expected category/tool/command)")]
    UnknownPath(String),
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn require_name(kind: &'static str, name: &str) -> Result<String, CatalogError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::EmptyName(kind));
    }
    Ok(name.to_string())
}

/// A parameterized command line, e.g. `pdftotext {input} {output}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandTemplate {
    #[serde(skip, default = "new_id")]
    pub id: String,
    pub name: String,
    pub template: String,
    #[serde(default)]
    pub param_types: BTreeMap<String, ParamKind>,
}

impl CommandTemplate {
    /// Create a command, normalizing `param_types` against the template's placeholders.
    #[must_use]
    pub fn new(name: &str, template: &str, param_types: &BTreeMap<String, ParamKind>) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
            template: template.to_string(),
            param_types: template::normalize_param_types(template, param_types),
        }
    }

    /// Parameters in template order (each name once), with absent kinds as `String`
    #[must_use]
    pub fn parameters(&self) -> Vec<(String, ParamKind)> {
        template::unique_parameters(&self.template)
            .into_iter()
            .map(|name| {
                let kind = self.param_types.get(&name).copied().unwrap_or_default();
                (name, kind)
            })
            .collect()
    }
}

/// A named tool grouping related commands
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    #[serde(skip, default = "new_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub commands: Vec<CommandTemplate>,
}

/// Top-level grouping of tools
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(skip, default = "new_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tools: Vec<Tool>,
}

/// The category → tool → command tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub categories: Vec<Category>,
}

impl Catalog {
    #[must_use]
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    /// Total number of commands across all tools
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.categories
            .iter()
            .flat_map(|c| &c.tools)
            .map(|t| t.commands.len())
            .sum()
    }

    #[must_use]
    pub fn find_category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn find_tool(&self, id: &str) -> Option<&Tool> {
        self.categories
            .iter()
            .flat_map(|c| &c.tools)
            .find(|t| t.id == id)
    }

    #[must_use]
    pub fn find_command(&self, id: &str) -> Option<&CommandTemplate> {
        self.categories
            .iter()
            .flat_map(|c| &c.tools)
            .flat_map(|t| &t.commands)
            .find(|cmd| cmd.id == id)
    }

    /// The tool owning the command with `command_id`
    #[must_use]
    pub fn tool_of_command(&self, command_id: &str) -> Option<&Tool> {
        self.categories
            .iter()
            .flat_map(|c| &c.tools)
            .find(|t| t.commands.iter().any(|cmd| cmd.id == command_id))
    }

    fn category_mut(&mut self, id: &str) -> Result<&mut Category, CatalogError> {
        self.categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| CatalogError::NotFound {
                kind: "category",
                id: id.to_string(),
            })
    }

    fn tool_mut(&mut self, id: &str) -> Result<&mut Tool, CatalogError> {
        self.categories
            .iter_mut()
            .flat_map(|c| &mut c.tools)
            .find(|t| t.id == id)
            .ok_or_else(|| CatalogError::NotFound {
                kind: "tool",
                id: id.to_string(),
            })
    }

    fn command_mut(&mut self, id: &str) -> Result<&mut CommandTemplate, CatalogError> {
        self.categories
            .iter_mut()
            .flat_map(|c| &mut c.tools)
            .flat_map(|t| &mut t.commands)
            .find(|cmd| cmd.id == id)
            .ok_or_else(|| CatalogError::NotFound {
                kind: "command",
                id: id.to_string(),
            })
    }

    /// Resolve `category/tool/command` by names.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::UnknownPath` if any segment does not match.
    pub fn resolve_path(&self, path: &str) -> Result<&CommandTemplate, CatalogError> {
        let unknown = || CatalogError::UnknownPath(path.to_string());
        let mut parts = path.splitn(3, '/');
        let (Some(cat), Some(tool), Some(cmd)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(unknown());
        };
        self.categories
            .iter()
            .find(|c| c.name == cat)
            .and_then(|c| c.tools.iter().find(|t| t.name == tool))
            .and_then(|t| t.commands.iter().find(|c| c.name == cmd))
            .ok_or_else(unknown)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::EmptyName` if `name` is blank.
    pub fn add_category(&mut self, name: &str) -> Result<String, CatalogError> {
        let category = Category {
            id: new_id(),
            name: require_name("Category", name)?,
            tools: Vec::new(),
        };
        debug!("Adding category '{}'", category.name);
        let id = category.id.clone();
        self.categories.push(category);
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `CatalogError` if the category is unknown or `name` is blank.
    pub fn rename_category(&mut self, id: &str, name: &str) -> Result<(), CatalogError> {
        let name = require_name("Category", name)?;
        self.category_mut(id)?.name = name;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the category is unknown.
    pub fn delete_category(&mut self, id: &str) -> Result<Category, CatalogError> {
        let index = self
            .categories
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| CatalogError::NotFound {
                kind: "category",
                id: id.to_string(),
            })?;
        Ok(self.categories.remove(index))
    }

    /// Add a tool; a non-empty `template` also creates a command named after the tool.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the category is unknown or `name` is blank.
    pub fn add_tool(
        &mut self,
        category_id: &str,
        name: &str,
        description: &str,
        template: Option<&str>,
    ) -> Result<String, CatalogError> {
        let name = require_name("Tool", name)?;
        let commands = template
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| vec![CommandTemplate::new(&name, t, &BTreeMap::new())])
            .unwrap_or_default();
        let tool = Tool {
            id: new_id(),
            name,
            description: description.trim().to_string(),
            commands,
        };
        let id = tool.id.clone();
        self.category_mut(category_id)?.tools.push(tool);
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `CatalogError` if the tool is unknown or `name` is blank.
    pub fn edit_tool(&mut self, id: &str, name: &str, description: &str) -> Result<(), CatalogError> {
        let name = require_name("Tool", name)?;
        let tool = self.tool_mut(id)?;
        tool.name = name;
        description.trim().clone_into(&mut tool.description);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the tool is unknown.
    pub fn delete_tool(&mut self, id: &str) -> Result<Tool, CatalogError> {
        for category in &mut self.categories {
            if let Some(index) = category.tools.iter().position(|t| t.id == id) {
                return Ok(category.tools.remove(index));
            }
        }
        Err(CatalogError::NotFound {
            kind: "tool",
            id: id.to_string(),
        })
    }

    /// # Errors
    ///
    /// Returns `CatalogError` if the tool is unknown, or the name or template is blank.
    pub fn add_command(
        &mut self,
        tool_id: &str,
        name: &str,
        template: &str,
        param_types: &BTreeMap<String, ParamKind>,
    ) -> Result<String, CatalogError> {
        let name = require_name("Command", name)?;
        let template = template.trim();
        if template.is_empty() {
            return Err(CatalogError::EmptyTemplate);
        }
        let command = CommandTemplate::new(&name, template, param_types);
        let id = command.id.clone();
        self.tool_mut(tool_id)?.commands.push(command);
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `CatalogError` if the command is unknown, or the name or template is blank.
    pub fn edit_command(
        &mut self,
        id: &str,
        name: &str,
        template: &str,
        param_types: &BTreeMap<String, ParamKind>,
    ) -> Result<(), CatalogError> {
        let name = require_name("Command", name)?;
        let template = template.trim();
        if template.is_empty() {
            return Err(CatalogError::EmptyTemplate);
        }
        let command = self.command_mut(id)?;
        command.name = name;
        template.clone_into(&mut command.template);
        command.param_types = template::normalize_param_types(template, param_types);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the command is unknown.
    pub fn delete_command(&mut self, id: &str) -> Result<CommandTemplate, CatalogError> {
        for tool in self.categories.iter_mut().flat_map(|c| &mut c.tools) {
            if let Some(index) = tool.commands.iter().position(|c| c.id == id) {
                return Ok(tool.commands.remove(index));
            }
        }
        Err(CatalogError::NotFound {
            kind: "command",
            id: id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Catalog, String, String) {
        let mut catalog = Catalog::default();
        let cat = catalog.add_category("Documents").unwrap();
        let tool = catalog
            .add_tool(&cat, "pdftotext", "PDF to text", Some("pdftotext {input} {output}"))
            .unwrap();
        (catalog, cat, tool)
    }

    #[test]
    fn test_add_tool_with_template_creates_command() {
        let (catalog, _, tool) = sample();
        let tool = catalog.find_tool(&tool).unwrap();
        assert_eq!(tool.commands.len(), 1);
        assert_eq!(tool.commands[0].name, "pdftotext");
        assert_eq!(tool.commands[0].param_types.len(), 2);
        assert_eq!(tool.commands[0].param_types["input"], ParamKind::String);
    }

    #[test]
    fn test_empty_names_rejected() {
        let mut catalog = Catalog::default();
        assert_eq!(
            catalog.add_category("   "),
            Err(CatalogError::EmptyName("Category"))
        );
        let (mut catalog, _, tool) = sample();
        assert_eq!(
            catalog.add_command(&tool, "x", "  ", &BTreeMap::new()),
            Err(CatalogError::EmptyTemplate)
        );
    }

    #[test]
    fn test_edit_command_renormalizes_param_types() {
        let (mut catalog, _, tool) = sample();
        let cmd_id = catalog.find_tool(&tool).unwrap().commands[0].id.clone();
        let mut types = BTreeMap::new();
        types.insert("file".to_string(), ParamKind::File);
        catalog
            .edit_command(&cmd_id, "cat", "cat {file} {lines}", &types)
            .unwrap();
        let cmd = catalog.find_command(&cmd_id).unwrap();
        assert_eq!(cmd.template, "cat {file} {lines}");
        assert_eq!(
            cmd.parameters(),
            vec![
                ("file".to_string(), ParamKind::File),
                ("lines".to_string(), ParamKind::String)
            ]
        );
    }

    #[test]
    fn test_delete_nodes() {
        let (mut catalog, cat, tool) = sample();
        let cmd_id = catalog.find_tool(&tool).unwrap().commands[0].id.clone();
        assert!(catalog.delete_command(&cmd_id).is_ok());
        assert_eq!(catalog.command_count(), 0);
        assert!(catalog.delete_tool(&tool).is_ok());
        assert!(catalog.delete_tool(&tool).is_err());
        assert!(catalog.delete_category(&cat).is_ok());
        assert!(catalog.categories.is_empty());
    }

    #[test]
    fn test_resolve_path() {
        let (catalog, _, _) = sample();
        let cmd = catalog.resolve_path("Documents/pdftotext/pdftotext").unwrap();
        assert_eq!(cmd.template, "pdftotext {input} {output}");
        assert!(matches!(
            catalog.resolve_path("Documents/pdftotext"),
            Err(CatalogError::UnknownPath(_))
        ));
    }

    #[test]
    fn test_parameters_deduplicate() {
        let cmd = CommandTemplate::new("dup", "{a} {b} {a}", &BTreeMap::new());
        let names: Vec<String> = cmd.parameters().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
