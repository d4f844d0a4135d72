use std::borrow::Cow;

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use super::app::{App, Focus};
use super::dialog::Dialog;
use super::tree_widget::NodeKind;
use crate::theme;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolbarAction {
    Toggle,
    Run,
    AddChild,
    AddCategory,
    Edit,
    Delete,
    StopShell,
    ToggleTerminalMode,
    Import,
    Export,
    RemoteLoad,
    ToggleFullscreen,
    FocusInput,
    BackToTree,
    ToggleLogs,
    Quit,
}

struct Shortcut {
    key: &'static str,
    desc: Cow<'static, str>,
}

impl Shortcut {
    fn new(key: &'static str, desc: impl Into<Cow<'static, str>>) -> Self {
        Self {
            key,
            desc: desc.into(),
        }
    }

    /// Width this shortcut occupies: " key " (padded badge) + space + desc
    fn width(&self) -> usize {
        1 + self.key.chars().count() + 1 + 1 + self.desc.chars().count()
    }
}

fn get_shortcuts(app: &App) -> Vec<Shortcut> {
    let mut shortcuts = Vec::new();

    match &app.dialog {
        Some(Dialog::Form(_)) => {
            shortcuts.push(Shortcut::new("ENTER", "Next / submit"));
            shortcuts.push(Shortcut::new("TAB", "Next field"));
            shortcuts.push(Shortcut::new("^U", "Clear field"));
            shortcuts.push(Shortcut::new("ESC", "Cancel"));
            return shortcuts;
        }
        Some(Dialog::Confirm(_)) => {
            shortcuts.push(Shortcut::new("Y", "Delete"));
            shortcuts.push(Shortcut::new("N", "Cancel"));
            return shortcuts;
        }
        None => {}
    }

    if app.fullscreen {
        shortcuts.push(Shortcut::new("^R", "Exit fullscreen"));
        shortcuts.push(Shortcut::new("ESC", "Back to tree"));
        shortcuts.push(Shortcut::new("^C", "Quit"));
        return shortcuts;
    }

    match app.focus {
        Focus::Input => {
            shortcuts.push(Shortcut::new("ENTER", "Send"));
            shortcuts.push(Shortcut::new("↑↓", "History"));
            shortcuts.push(Shortcut::new("PGUP", "Scroll"));
            shortcuts.push(Shortcut::new("ESC", "Back to tree"));
            shortcuts.push(Shortcut::new("^R", "Fullscreen"));
            shortcuts.push(Shortcut::new("^C", "Quit"));
        }
        Focus::Tree => {
            match app.visible_nodes.get(app.cursor).map(|n| &n.kind) {
                Some(NodeKind::Command { .. }) => {
                    shortcuts.push(Shortcut::new("ENTER", "Run"));
                    shortcuts.push(Shortcut::new("A", "Add command"));
                }
                Some(NodeKind::Tool { expanded, .. }) => {
                    let label = if *expanded { "Collapse" } else { "Expand" };
                    shortcuts.push(Shortcut::new("SPACE", label));
                    shortcuts.push(Shortcut::new("A", "Add command"));
                }
                Some(NodeKind::Category { expanded, .. }) => {
                    let label = if *expanded { "Collapse" } else { "Expand" };
                    shortcuts.push(Shortcut::new("SPACE", label));
                    shortcuts.push(Shortcut::new("A", "Add tool"));
                }
                None => {}
            }
            if !app.visible_nodes.is_empty() {
                shortcuts.push(Shortcut::new("E", "Edit"));
                shortcuts.push(Shortcut::new("D", "Delete"));
            }
            shortcuts.push(Shortcut::new("⇧A", "Add category"));

            let mode = if app.use_internal_terminal {
                "External terminal"
            } else {
                "Internal shell"
            };
            shortcuts.push(Shortcut::new("T", mode));
            if app.use_internal_terminal {
                shortcuts.push(Shortcut::new("S", "Stop shell"));
                shortcuts.push(Shortcut::new("TAB", "Input"));
            }
            shortcuts.push(Shortcut::new("I", "Import"));
            shortcuts.push(Shortcut::new("X", "Export"));
            shortcuts.push(Shortcut::new("U", "Load URL"));

            let log_label = if app.show_logs { "Hide logs" } else { "Logs" };
            shortcuts.push(Shortcut::new("L", log_label));
            shortcuts.push(Shortcut::new("Q", "Quit"));
        }
    }

    shortcuts
}

/// Separator between shortcuts
const SEP: &str = "  ";

/// The bottom bar: shortcuts for the current state, cut off at `width`
pub fn build_toolbar_line(app: &App, width: u16) -> Line<'static> {
    let shortcuts = get_shortcuts(app);
    let max_width = width as usize;

    let key_style = Style::default()
        .fg(theme::TOOLBAR_KEY_FG)
        .bg(theme::TOOLBAR_KEY_BG)
        .add_modifier(Modifier::BOLD);
    let desc_style = Style::default()
        .fg(theme::TOOLBAR_DESC)
        .bg(theme::TOOLBAR_BG);
    let bg_style = Style::default().bg(theme::TOOLBAR_BG);

    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut x = 0usize;

    for (i, shortcut) in shortcuts.iter().enumerate() {
        let sep_width = if i > 0 { SEP.len() } else { 0 };
        if x + sep_width + shortcut.width() > max_width {
            break;
        }

        if i > 0 {
            spans.push(Span::styled(SEP, bg_style));
            x += sep_width;
        }

        // Key rendered as a badge: " KEY " on dark background
        spans.push(Span::styled(format!(" {} ", shortcut.key), key_style));
        spans.push(Span::styled(" ", bg_style));
        spans.push(Span::styled(shortcut.desc.clone(), desc_style));
        x += shortcut.width();
    }

    // Fill remaining width with background
    if x < max_width {
        spans.push(Span::styled(" ".repeat(max_width - x), bg_style));
    }

    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::super::app::test_app;
    use super::*;

    fn text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    const CATALOG: &str = r#"{"categories": [{"name": "net", "tools": [{"name": "ping", "commands": [
        {"name": "once", "template": "ping -c 1 {host}"}
    ]}]}], "use_internal_terminal": true}"#;

    #[test]
    fn test_tree_shortcuts_follow_cursor() {
        let (mut app, _dir) = test_app(CATALOG);
        let line = text(&build_toolbar_line(&app, 200));
        assert!(line.starts_with(" SPACE  Collapse   A  Add tool"));

        app.cursor = 2;
        let line = text(&build_toolbar_line(&app, 200));
        assert!(line.starts_with(" ENTER  Run   A  Add command"));
        assert!(line.contains(" S  Stop shell"));
    }

    #[test]
    fn test_line_is_cut_at_whole_shortcuts() {
        let (app, _dir) = test_app(CATALOG);
        // " SPACE  Collapse" is 16 wide, the next shortcut needs 2 + 12 more
        let line = text(&build_toolbar_line(&app, 20));
        assert_eq!(line, " SPACE  Collapse    ");
    }

    #[test]
    fn test_dialog_shortcuts() {
        let (mut app, _dir) = test_app(CATALOG);
        app.execute_toolbar_action(ToolbarAction::AddCategory);
        let line = text(&build_toolbar_line(&app, 200));
        assert!(line.starts_with(" ENTER  Next / submit"));
        assert!(line.contains(" ESC  Cancel"));
    }
}
