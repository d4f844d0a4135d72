use std::collections::HashMap;

use crate::commands::catalog::{Catalog, Category, Tool};

use super::tree_widget::{NodeKind, VisibleNode};

/// Shared state passed through tree flattening
pub(super) struct TreeContext<'a> {
    pub expanded: &'a HashMap<String, bool>,
    pub nodes: &'a mut Vec<VisibleNode>,
}

impl TreeContext<'_> {
    fn is_expanded(&self, id: &str) -> bool {
        *self.expanded.get(id).unwrap_or(&true)
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "child counts never exceed u16"
)]
fn count(len: usize) -> u16 {
    len as u16
}

/// Flatten the catalog into rows: categories at depth 0, tools at 1, commands at 2
pub(super) fn flatten_catalog(catalog: &Catalog, ctx: &mut TreeContext<'_>) {
    let total = catalog.categories.len();
    for (i, category) in catalog.categories.iter().enumerate() {
        flatten_category(category, i + 1 == total, ctx);
    }
}

fn flatten_category(category: &Category, is_last: bool, ctx: &mut TreeContext<'_>) {
    let expanded = ctx.is_expanded(&category.id);
    ctx.nodes.push(VisibleNode {
        id: category.id.clone(),
        depth: 0,
        is_last_sibling: is_last,
        ancestor_is_last: Vec::new(),
        kind: NodeKind::Category {
            name: category.name.clone(),
            expanded,
            tools: count(category.tools.len()),
        },
    });

    if expanded {
        // Categories are roots: their children get no continuation column
        let total = category.tools.len();
        for (i, tool) in category.tools.iter().enumerate() {
            flatten_tool(tool, i + 1 == total, ctx);
        }
    }
}

fn flatten_tool(tool: &Tool, is_last: bool, ctx: &mut TreeContext<'_>) {
    let expanded = ctx.is_expanded(&tool.id);
    ctx.nodes.push(VisibleNode {
        id: tool.id.clone(),
        depth: 1,
        is_last_sibling: is_last,
        ancestor_is_last: Vec::new(),
        kind: NodeKind::Tool {
            name: tool.name.clone(),
            description: tool.description.clone(),
            expanded,
            commands: count(tool.commands.len()),
        },
    });

    if expanded {
        let total = tool.commands.len();
        for (i, command) in tool.commands.iter().enumerate() {
            ctx.nodes.push(VisibleNode {
                id: command.id.clone(),
                depth: 2,
                is_last_sibling: i + 1 == total,
                ancestor_is_last: vec![is_last],
                kind: NodeKind::Command {
                    name: command.name.clone(),
                    template: command.template.clone(),
                },
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_file::Config;
    use crate::tui::tree_widget::render_node_text;

    fn sample() -> Catalog {
        let config = Config::from_json(
            r#"[
                {"name": "net", "tools": [
                    {"name": "ping", "description": "reachability", "commands": [
                        {"name": "once", "template": "ping -c 1 {host}"},
                        {"name": "flood", "template": "ping -f {host}"}
                    ]},
                    {"name": "dig", "commands": [
                        {"name": "any", "template": "dig {domain} ANY"}
                    ]}
                ]},
                {"name": "files", "tools": []}
            ]"#,
            "test",
        )
        .unwrap();
        config.into_catalog().0
    }

    fn lines(catalog: &Catalog, expanded: &HashMap<String, bool>) -> Vec<String> {
        let mut nodes = Vec::new();
        let mut ctx = TreeContext {
            expanded,
            nodes: &mut nodes,
        };
        flatten_catalog(catalog, &mut ctx);
        nodes.iter().map(render_node_text).collect()
    }

    #[test]
    fn test_flatten_catalog_renders_tree() {
        let catalog = sample();
        insta::assert_snapshot!(lines(&catalog, &HashMap::new()).join("\n"), @r"
        ▼ net (2)
        ├─▼ ping (2)  reachability
        │ ├─• once  ping -c 1 {host}
        │ └─• flood  ping -f {host}
        └─▼ dig (1)
          └─• any  dig {domain} ANY
        ▼ files (0)
        ");
    }

    #[test]
    fn test_collapsed_nodes_hide_children() {
        let catalog = sample();
        let mut expanded = HashMap::new();
        expanded.insert(catalog.categories[0].tools[0].id.clone(), false);
        expanded.insert(catalog.categories[1].id.clone(), false);
        assert_eq!(
            lines(&catalog, &expanded),
            [
                "▼ net (2)",
                "├─▶ ping (2)  reachability",
                "└─▼ dig (1)",
                "  └─• any  dig {domain} ANY",
                "▶ files (0)",
            ]
        );
    }
}
