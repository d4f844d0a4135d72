use crate::theme;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Widget;

/// The type and display data for a tree node
#[derive(Debug, Clone)]
pub enum NodeKind {
    Category {
        name: String,
        expanded: bool,
        tools: u16,
    },
    Tool {
        name: String,
        description: String,
        expanded: bool,
        commands: u16,
    },
    Command {
        name: String,
        template: String,
    },
}

/// A flattened tree node ready for rendering
#[derive(Debug, Clone)]
pub struct VisibleNode {
    pub id: String,
    pub depth: usize,
    pub is_last_sibling: bool,
    /// For each ancestor depth below the root, whether that ancestor was the last sibling.
    /// Used to decide between drawing `│ ` (continuation) or `  ` (blank).
    pub ancestor_is_last: Vec<bool>,
    pub kind: NodeKind,
}

/// Ratatui widget that renders the catalog tree
pub struct TreeWidget<'a> {
    nodes: &'a [VisibleNode],
    cursor: usize,
    scroll_offset: usize,
    focused: bool,
}

impl<'a> TreeWidget<'a> {
    #[must_use]
    pub fn new(nodes: &'a [VisibleNode], cursor: usize, scroll_offset: usize, focused: bool) -> Self {
        Self {
            nodes,
            cursor,
            scroll_offset,
            focused,
        }
    }
}

fn arrow(expanded: bool) -> &'static str {
    if expanded { "▼ " } else { "▶ " }
}

/// Build the prefix string (tree guides) for a node, without styling.
fn build_prefix(node: &VisibleNode) -> String {
    let mut prefix = String::new();
    for &level in &node.ancestor_is_last {
        prefix.push_str(if level { "  " } else { "│ " });
    }
    if node.depth > 0 {
        prefix.push_str(if node.is_last_sibling { "└─" } else { "├─" });
    }
    prefix
}

/// Build the plain text representation of a node (prefix + content).
#[must_use]
pub fn render_node_text(node: &VisibleNode) -> String {
    let mut text = build_prefix(node);
    match &node.kind {
        NodeKind::Category {
            name,
            expanded,
            tools,
        } => {
            text.push_str(arrow(*expanded));
            text.push_str(&format!("{name} ({tools})"));
        }
        NodeKind::Tool {
            name,
            description,
            expanded,
            commands,
        } => {
            text.push_str(arrow(*expanded));
            text.push_str(&format!("{name} ({commands})"));
            if !description.is_empty() {
                text.push_str("  ");
                text.push_str(description);
            }
        }
        NodeKind::Command { name, template } => {
            text.push_str("• ");
            text.push_str(name);
            text.push_str("  ");
            text.push_str(template);
        }
    }
    text
}

impl Widget for TreeWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let visible_height = area.height as usize;
        let visible_nodes = self
            .nodes
            .iter()
            .skip(self.scroll_offset)
            .take(visible_height);

        for (i, node) in visible_nodes.enumerate() {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "row index bounded by area.height which is u16"
            )]
            let y = area.y + i as u16;
            let is_highlighted = i + self.scroll_offset == self.cursor;

            let highlight = |base: Style| {
                if is_highlighted && self.focused {
                    base.fg(theme::ACCENT).add_modifier(Modifier::UNDERLINED)
                } else if is_highlighted {
                    base.add_modifier(Modifier::UNDERLINED)
                } else {
                    base
                }
            };
            let dim = Style::default().fg(theme::DIM);

            let mut spans = vec![Span::styled(
                build_prefix(node),
                Style::default().fg(theme::TREE),
            )];

            match &node.kind {
                NodeKind::Category {
                    name,
                    expanded,
                    tools,
                } => {
                    let style = highlight(
                        Style::default()
                            .fg(theme::CATEGORY)
                            .add_modifier(Modifier::BOLD),
                    );
                    spans.push(Span::styled(arrow(*expanded), style));
                    spans.push(Span::styled(name.as_str(), style));
                    spans.push(Span::styled(format!(" ({tools})"), dim));
                }
                NodeKind::Tool {
                    name,
                    description,
                    expanded,
                    commands,
                } => {
                    let style = highlight(Style::default().fg(theme::TOOL));
                    spans.push(Span::styled(arrow(*expanded), style));
                    spans.push(Span::styled(name.as_str(), style));
                    spans.push(Span::styled(format!(" ({commands})"), dim));
                    if !description.is_empty() {
                        spans.push(Span::styled(format!("  {description}"), dim));
                    }
                }
                NodeKind::Command { name, template } => {
                    let style = highlight(Style::default().fg(theme::COMMAND));
                    spans.push(Span::styled("• ", Style::default().fg(theme::ACCENT)));
                    spans.push(Span::styled(name.as_str(), style));
                    spans.push(Span::styled(format!("  {template}"), dim));
                }
            }

            buf.set_line(area.x, y, &Line::from(spans), area.width);
        }
    }
}
