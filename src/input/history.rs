/// Submitted commands plus a navigation cursor.
///
/// The cursor ranges over `0..=len`; `len` is the "one past the end" position
/// where the user edits a fresh line (the draft).
#[derive(Debug, Default, Clone)]
pub struct CommandHistory {
    entries: Vec<String>,
    cursor: usize,
    draft: Option<String>,
}

impl CommandHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn at_end(&self) -> bool {
        self.cursor == self.entries.len()
    }

    /// Record a submitted command and move the cursor past the end
    pub fn push(&mut self, command: impl Into<String>) {
        self.entries.push(command.into());
        self.cursor = self.entries.len();
        self.draft = None;
    }

    /// Step back one entry. `current_line` is kept as the draft when leaving the end.
    ///
    /// Returns the line to show, or `None` when already at the oldest entry.
    pub fn up(&mut self, current_line: &str) -> Option<&str> {
        if self.cursor == 0 {
            return None;
        }
        if self.at_end() {
            self.draft = Some(current_line.to_string());
        }
        self.cursor -= 1;
        self.entries.get(self.cursor).map(String::as_str)
    }

    /// Step forward one entry and return the line to show.
    ///
    /// At the end this clears the line; arriving at the end restores the draft.
    pub fn down(&mut self) -> String {
        if self.at_end() {
            self.draft = None;
            return String::new();
        }
        self.cursor += 1;
        if self.at_end() {
            self.draft.take().unwrap_or_default()
        } else {
            self.entries[self.cursor].clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with(entries: &[&str]) -> CommandHistory {
        let mut history = CommandHistory::new();
        for entry in entries {
            history.push(*entry);
        }
        history
    }

    #[test]
    fn test_up_up_down_down() {
        let mut history = with(&["a", "b", "c"]);
        assert_eq!(history.up(""), Some("c"));
        assert_eq!(history.up("c"), Some("b"));
        assert_eq!(history.down(), "c");
        assert_eq!(history.down(), "");
        assert!(history.at_end());
    }

    #[test]
    fn test_up_at_oldest_is_noop() {
        let mut history = with(&["a"]);
        assert_eq!(history.up(""), Some("a"));
        assert_eq!(history.up("a"), None);
        assert_eq!(history.cursor(), 0);
    }

    #[test]
    fn test_up_on_empty_history_is_noop() {
        let mut history = CommandHistory::new();
        assert_eq!(history.up("typed"), None);
        assert_eq!(history.cursor(), 0);
    }

    #[test]
    fn test_draft_is_restored() {
        let mut history = with(&["a", "b"]);
        assert_eq!(history.up("half typed"), Some("b"));
        assert_eq!(history.down(), "half typed");
        // Down at the end clears the line and keeps the cursor
        assert_eq!(history.down(), "");
        assert_eq!(history.cursor(), 2);
    }

    #[test]
    fn test_push_resets_cursor() {
        let mut history = with(&["a", "b"]);
        history.up("");
        history.up("");
        history.push("c");
        assert_eq!(history.cursor(), 3);
        assert_eq!(history.entries(), ["a", "b", "c"]);
    }
}
