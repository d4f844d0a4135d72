use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::debug;

use super::app::{App, Focus, NoticeLevel};
use super::dialog::DialogOutcome;
use super::event::translate_key_event;
use super::output_state::LineKind;
use super::toolbar::ToolbarAction;
use crate::input::InputOutcome;
use crate::pty::messages::format_echo;

impl App {
    /// Handle keyboard input
    pub fn handle_key(&mut self, key: KeyEvent) {
        // Global keys
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if key.code == KeyCode::Char('r') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.execute_toolbar_action(ToolbarAction::ToggleFullscreen);
            return;
        }

        // An open dialog swallows every other key
        if let Some(dialog) = self.dialog.as_mut() {
            match dialog.handle_key(key) {
                DialogOutcome::Pending => {}
                DialogOutcome::Cancelled => self.dialog = None,
                DialogOutcome::Submitted(values) => {
                    if let Some(dialog) = self.dialog.take() {
                        self.submit_dialog(dialog, &values);
                    }
                }
            }
            return;
        }

        match self.focus {
            Focus::Input => self.handle_input_key(key),
            Focus::Tree => self.handle_tree_key(key),
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        let page = self.output_height.max(1);
        match key.code {
            KeyCode::Esc | KeyCode::Tab => {
                self.execute_toolbar_action(ToolbarAction::BackToTree);
                return;
            }
            KeyCode::PageUp => {
                self.output.scroll_up(page, self.output_height);
                return;
            }
            KeyCode::PageDown => {
                self.output.scroll_down(page);
                return;
            }
            _ => {}
        }

        let Some(input_key) = translate_key_event(&key) else {
            debug!("Ignoring key {key:?} in input line");
            return;
        };
        match self.console.handle_key(input_key) {
            Ok(InputOutcome::Submitted(command)) => {
                self.output.push_line(LineKind::Echo, &format_echo(&command));
                self.output.scroll = 0;
            }
            Ok(InputOutcome::Edited | InputOutcome::Ignored) => {}
            Err(e) => self.notify(NoticeLevel::Error, format!("{e}")),
        }
    }

    fn handle_tree_key(&mut self, key: KeyEvent) {
        let action = match key.code {
            KeyCode::Char('q') => ToolbarAction::Quit,
            KeyCode::Char('j') | KeyCode::Down => {
                if self.cursor + 1 < self.visible_nodes.len() {
                    self.cursor += 1;
                }
                return;
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.cursor = self.cursor.saturating_sub(1);
                return;
            }
            KeyCode::Char('h') | KeyCode::Left => {
                self.set_current_expanded(Some(false));
                return;
            }
            KeyCode::Char('l') | KeyCode::Right => {
                self.set_current_expanded(Some(true));
                return;
            }
            KeyCode::Char(' ') => ToolbarAction::Toggle,
            KeyCode::Enter | KeyCode::Char('r') => ToolbarAction::Run,
            KeyCode::Char('a') => ToolbarAction::AddChild,
            KeyCode::Char('A') => ToolbarAction::AddCategory,
            KeyCode::Char('e') => ToolbarAction::Edit,
            KeyCode::Char('d') | KeyCode::Delete => ToolbarAction::Delete,
            KeyCode::Char('s') => ToolbarAction::StopShell,
            KeyCode::Char('t') => ToolbarAction::ToggleTerminalMode,
            KeyCode::Char('i') => ToolbarAction::Import,
            KeyCode::Char('x') => ToolbarAction::Export,
            KeyCode::Char('u') => ToolbarAction::RemoteLoad,
            KeyCode::Char('L') => ToolbarAction::ToggleLogs,
            KeyCode::Tab => ToolbarAction::FocusInput,
            KeyCode::PageUp => {
                if self.show_logs {
                    self.log_scroll += self.output_height.max(1);
                } else {
                    self.output.scroll_up(self.output_height.max(1), self.output_height);
                }
                return;
            }
            KeyCode::PageDown => {
                if self.show_logs {
                    self.log_scroll = self.log_scroll.saturating_sub(self.output_height.max(1));
                } else {
                    self.output.scroll_down(self.output_height.max(1));
                }
                return;
            }
            _ => return,
        };
        self.execute_toolbar_action(action);
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    use super::super::app::{App, Focus, test_app};
    use super::super::dialog::Dialog;

    fn app() -> (App, tempfile::TempDir) {
        test_app(
            r#"[{"name": "net", "tools": [{"name": "ping", "commands": [
                {"name": "once", "template": "ping -c 1 {host}"}
            ]}]}]"#,
        )
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_navigation_and_collapse() {
        let (mut app, _dir) = app();
        assert_eq!(app.visible_nodes.len(), 3);
        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('h'));
        app.rebuild_visible_nodes();
        assert_eq!(app.visible_nodes.len(), 2);
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.cursor, 1);
    }

    #[test]
    fn test_dialog_captures_keys() {
        let (mut app, _dir) = app();
        press(&mut app, KeyCode::Char('A'));
        for c in "tools".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        // 'q' is typed into the field instead of quitting
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.should_quit);
        press(&mut app, KeyCode::Enter);
        assert!(app.dialog.is_none());
        assert_eq!(app.catalog.categories[1].name, "toolsq");
    }

    #[test]
    fn test_escape_cancels_dialog() {
        let (mut app, _dir) = app();
        press(&mut app, KeyCode::Char('e'));
        assert!(matches!(app.dialog, Some(Dialog::Form(_))));
        press(&mut app, KeyCode::Esc);
        assert!(app.dialog.is_none());
        assert!(!app.should_quit);
    }

    #[test]
    fn test_tab_switches_focus() {
        let (mut app, _dir) = app();
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::Input);
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.should_quit);
        assert_eq!(app.console.input().line().text(), "q");
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.focus, Focus::Tree);
    }

    #[test]
    fn test_ctrl_c_quits_everywhere() {
        let (mut app, _dir) = app();
        press(&mut app, KeyCode::Tab);
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }
}
