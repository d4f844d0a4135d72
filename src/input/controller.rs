use log::debug;

use super::history::CommandHistory;
use crate::pty::{SessionError, ShellSession};

/// Marker shown before the editable part of the input line
pub const PROMPT: &str = "> ";

/// Where submitted commands go
pub trait CommandSink {
    /// Forward one command line.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the command cannot be delivered.
    fn submit(&mut self, command: &str) -> Result<(), SessionError>;
}

impl CommandSink for ShellSession {
    fn submit(&mut self, command: &str) -> Result<(), SessionError> {
        self.write(command)
    }
}

/// Input events understood by the controller, independent of the terminal backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKey {
    Char(char),
    Submit { modified: bool },
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Backspace,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    /// The command was recorded and forwarded to the sink
    Submitted(String),
    Edited,
    Ignored,
}

/// The text after the prompt, with a byte-offset cursor on a char boundary
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InputLine {
    text: String,
    cursor: usize,
}

impl InputLine {
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Cursor position in chars, for rendering
    #[must_use]
    pub fn cursor_column(&self) -> usize {
        self.text[..self.cursor].chars().count()
    }

    /// Prompt and text as displayed
    #[must_use]
    pub fn display(&self) -> String {
        format!("{PROMPT}{}", self.text)
    }

    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = self.text.len();
    }

    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    fn insert(&mut self, c: char) {
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    fn prev_boundary(&self) -> Option<usize> {
        self.text[..self.cursor]
            .chars()
            .next_back()
            .map(|c| self.cursor - c.len_utf8())
    }

    fn next_boundary(&self) -> Option<usize> {
        self.text[self.cursor..]
            .chars()
            .next()
            .map(|c| self.cursor + c.len_utf8())
    }

    /// Cursor 0 is the prompt boundary: nothing before it can be erased
    fn backspace(&mut self) -> bool {
        let Some(prev) = self.prev_boundary() else {
            return false;
        };
        self.text.replace_range(prev..self.cursor, "");
        self.cursor = prev;
        true
    }

    fn delete(&mut self) -> bool {
        let Some(next) = self.next_boundary() else {
            return false;
        };
        self.text.replace_range(self.cursor..next, "");
        true
    }

    fn move_to(&mut self, target: Option<usize>) -> bool {
        match target {
            Some(position) if position != self.cursor => {
                self.cursor = position;
                true
            }
            _ => false,
        }
    }
}

/// Turns key events into history navigation, line edits, or submitted commands
#[derive(Debug, Default)]
pub struct InputController {
    line: InputLine,
    history: CommandHistory,
}

impl InputController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn line(&self) -> &InputLine {
        &self.line
    }

    #[must_use]
    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    /// Apply one key event. Submitted commands are forwarded to `sink`.
    ///
    /// # Errors
    ///
    /// Propagates the sink's error; the command is still recorded in history.
    pub fn handle_key<S: CommandSink + ?Sized>(
        &mut self,
        key: InputKey,
        sink: &mut S,
    ) -> Result<InputOutcome, SessionError> {
        let edited = match key {
            InputKey::Submit { modified: true } => false,
            InputKey::Submit { modified: false } => {
                let command = self.line.take().trim().to_string();
                if command.is_empty() {
                    return Ok(InputOutcome::Edited);
                }
                self.history.push(command.clone());
                debug!("Submitting '{command}' from input line");
                sink.submit(&command)?;
                return Ok(InputOutcome::Submitted(command));
            }
            InputKey::Up => match self.history.up(self.line.text()) {
                Some(entry) => {
                    let entry = entry.to_string();
                    self.line.set(entry);
                    true
                }
                None => false,
            },
            InputKey::Down => {
                let entry = self.history.down();
                self.line.set(entry);
                true
            }
            InputKey::Char(c) => {
                self.line.insert(c);
                true
            }
            InputKey::Backspace => self.line.backspace(),
            InputKey::Delete => self.line.delete(),
            InputKey::Left => {
                let target = self.line.prev_boundary();
                self.line.move_to(target)
            }
            InputKey::Right => {
                let target = self.line.next_boundary();
                self.line.move_to(target)
            }
            InputKey::Home => self.line.move_to(Some(0)),
            InputKey::End => {
                let end = self.line.text.len();
                self.line.move_to(Some(end))
            }
        };
        Ok(if edited {
            InputOutcome::Edited
        } else {
            InputOutcome::Ignored
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        commands: Vec<String>,
    }

    impl CommandSink for RecordingSink {
        fn submit(&mut self, command: &str) -> Result<(), SessionError> {
            self.commands.push(command.to_string());
            Ok(())
        }
    }

    fn type_line(controller: &mut InputController, sink: &mut RecordingSink, text: &str) {
        for c in text.chars() {
            controller.handle_key(InputKey::Char(c), sink).unwrap();
        }
    }

    fn submit(controller: &mut InputController, sink: &mut RecordingSink, text: &str) {
        type_line(controller, sink, text);
        let outcome = controller
            .handle_key(InputKey::Submit { modified: false }, sink)
            .unwrap();
        assert_eq!(outcome, InputOutcome::Submitted(text.to_string()));
    }

    #[test]
    fn test_submit_forwards_and_records() {
        let mut controller = InputController::new();
        let mut sink = RecordingSink::default();
        submit(&mut controller, &mut sink, "ls -la");
        assert_eq!(sink.commands, ["ls -la"]);
        assert_eq!(controller.history().entries(), ["ls -la"]);
        assert_eq!(controller.line().display(), PROMPT);
    }

    #[test]
    fn test_empty_submit_is_not_recorded() {
        let mut controller = InputController::new();
        let mut sink = RecordingSink::default();
        type_line(&mut controller, &mut sink, "   ");
        controller
            .handle_key(InputKey::Submit { modified: false }, &mut sink)
            .unwrap();
        assert!(sink.commands.is_empty());
        assert!(controller.history().is_empty());
    }

    #[test]
    fn test_modified_submit_is_ignored() {
        let mut controller = InputController::new();
        let mut sink = RecordingSink::default();
        type_line(&mut controller, &mut sink, "pwd");
        let outcome = controller
            .handle_key(InputKey::Submit { modified: true }, &mut sink)
            .unwrap();
        assert_eq!(outcome, InputOutcome::Ignored);
        assert_eq!(controller.line().text(), "pwd");
    }

    #[test]
    fn test_history_navigation() {
        let mut controller = InputController::new();
        let mut sink = RecordingSink::default();
        for command in ["a", "b", "c"] {
            submit(&mut controller, &mut sink, command);
        }
        let mut press = |key| {
            controller.handle_key(key, &mut sink).unwrap();
            controller.line().text().to_string()
        };
        assert_eq!(press(InputKey::Up), "c");
        assert_eq!(press(InputKey::Up), "b");
        assert_eq!(press(InputKey::Down), "c");
        assert_eq!(press(InputKey::Down), "");
    }

    #[test]
    fn test_backspace_cannot_erase_prompt() {
        let mut controller = InputController::new();
        let mut sink = RecordingSink::default();
        type_line(&mut controller, &mut sink, "ab");
        controller.handle_key(InputKey::Home, &mut sink).unwrap();
        let outcome = controller
            .handle_key(InputKey::Backspace, &mut sink)
            .unwrap();
        assert_eq!(outcome, InputOutcome::Ignored);
        assert_eq!(controller.line().display(), "> ab");
    }

    #[test]
    fn test_editing_in_the_middle() {
        let mut controller = InputController::new();
        let mut sink = RecordingSink::default();
        type_line(&mut controller, &mut sink, "échoo");
        controller.handle_key(InputKey::Left, &mut sink).unwrap();
        controller.handle_key(InputKey::Backspace, &mut sink).unwrap();
        assert_eq!(controller.line().text(), "écho");
        assert_eq!(controller.line().cursor_column(), 3);
        controller.handle_key(InputKey::Home, &mut sink).unwrap();
        controller.handle_key(InputKey::Delete, &mut sink).unwrap();
        assert_eq!(controller.line().text(), "cho");
    }

    #[test]
    fn test_write_to_stopped_session_is_reported() {
        use crate::pty::{SessionState, ShellProgram, TerminalSize};

        let mut controller = InputController::new();
        let mut session =
            ShellSession::new(ShellProgram::new("cat", &[]), TerminalSize::default());
        controller.handle_key(InputKey::Char('x'), &mut session).unwrap();
        let result = controller.handle_key(InputKey::Submit { modified: false }, &mut session);
        assert!(matches!(
            result,
            Err(SessionError::NotRunning(SessionState::NotStarted))
        ));
        assert_eq!(controller.history().entries(), ["x"]);
    }
}
