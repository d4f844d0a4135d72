use std::collections::VecDeque;

const MAX_OUTPUT_LINES: usize = 5000;
const TAB_WIDTH: usize = 8;
/// Longest unfinished escape sequence held back for the next chunk
const MAX_ESCAPE_CARRY: usize = 256;

/// Where a line in the output pane came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Shell,
    /// Echo of a command dispatched by the user
    Echo,
    /// Lifecycle messages such as restarts
    Notice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub kind: LineKind,
    pub text: String,
}

/// Scrollback of shell output as plain text lines.
///
/// Escape sequences are stripped; `\r\n` and `\n` end a line, a lone `\r`
/// rewinds the current line, backspace erases one char and tabs are expanded.
/// An escape sequence cut off at the end of a chunk is completed by the next one.
#[derive(Debug)]
pub struct OutputBuffer {
    lines: VecDeque<OutputLine>,
    /// Unterminated shell line, shown as the last row
    current: String,
    /// Trailing escape sequence still waiting for its final byte
    escape_carry: String,
    pending_cr: bool,
    capacity: usize,
    /// Rows scrolled up from the bottom
    pub scroll: usize,
}

impl OutputBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_OUTPUT_LINES)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            current: String::new(),
            escape_carry: String::new(),
            pending_cr: false,
            capacity: capacity.max(1),
            scroll: 0,
        }
    }

    /// Append a chunk of raw shell output
    pub fn push_output(&mut self, chunk: &str) {
        let mut joined = std::mem::take(&mut self.escape_carry);
        joined.push_str(chunk);
        let end = match unfinished_escape(&joined) {
            Some(start) if joined.len() - start <= MAX_ESCAPE_CARRY => start,
            _ => joined.len(),
        };
        self.escape_carry = joined[end..].to_string();
        self.push_chunk(&joined[..end]);
    }

    fn push_chunk(&mut self, chunk: &str) {
        let mut rest = chunk;
        while !rest.is_empty() {
            let split = rest.find(['\n', '\r', '\u{8}', '\t']).unwrap_or(rest.len());
            let (text, tail) = rest.split_at(split);
            if !text.is_empty() {
                self.push_text(&strip_ansi_escapes::strip_str(text));
            }
            let mut chars = tail.chars();
            if let Some(control) = chars.next() {
                self.push_control(control);
            }
            rest = chars.as_str();
        }
    }

    fn resolve_carriage_return(&mut self) {
        if self.pending_cr {
            self.pending_cr = false;
            self.current.clear();
        }
    }

    fn push_text(&mut self, text: &str) {
        self.resolve_carriage_return();
        self.current
            .extend(text.chars().filter(|c| !c.is_control()));
    }

    fn push_control(&mut self, control: char) {
        match control {
            '\n' => {
                self.pending_cr = false;
                self.finish_line(LineKind::Shell);
            }
            '\r' => self.pending_cr = true,
            '\u{8}' => {
                self.resolve_carriage_return();
                self.current.pop();
            }
            _ => {
                self.resolve_carriage_return();
                let width = self.current.chars().count();
                let pad = TAB_WIDTH - width % TAB_WIDTH;
                self.current.extend(std::iter::repeat_n(' ', pad));
            }
        }
    }

    /// Append a whole line of the given kind after any partial shell line
    pub fn push_line(&mut self, kind: LineKind, text: &str) {
        if !self.current.is_empty() {
            self.finish_line(LineKind::Shell);
        }
        for line in text.lines() {
            self.push_complete(OutputLine {
                kind,
                text: line.to_string(),
            });
        }
    }

    fn finish_line(&mut self, kind: LineKind) {
        let text = std::mem::take(&mut self.current);
        self.push_complete(OutputLine { kind, text });
    }

    fn push_complete(&mut self, line: OutputLine) {
        if self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
        // Keep the view anchored while the user is scrolled up
        if self.scroll > 0 {
            self.scroll = (self.scroll + 1).min(self.lines.len());
        }
    }

    /// Number of rows including the partial line
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len() + usize::from(!self.current.is_empty())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The rows visible in a viewport of `height`, honouring `scroll`
    #[must_use]
    pub fn visible(&self, height: usize) -> Vec<OutputLine> {
        let total = self.len();
        let scroll = self.scroll.min(total.saturating_sub(height));
        let end = total - scroll;
        let start = end.saturating_sub(height);
        let partial = (!self.current.is_empty()).then(|| OutputLine {
            kind: LineKind::Shell,
            text: self.current.clone(),
        });
        self.lines
            .iter()
            .cloned()
            .chain(partial)
            .skip(start)
            .take(end - start)
            .collect()
    }

    pub fn scroll_up(&mut self, rows: usize, height: usize) {
        let max = self.len().saturating_sub(height);
        self.scroll = (self.scroll + rows).min(max);
    }

    pub fn scroll_down(&mut self, rows: usize) {
        self.scroll = self.scroll.saturating_sub(rows);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.current.clear();
        self.escape_carry.clear();
        self.pending_cr = false;
        self.scroll = 0;
    }
}

/// Byte offset of an escape sequence at the end of `text` that lacks its final byte
fn unfinished_escape(text: &str) -> Option<usize> {
    let start = text.rfind('\u{1b}')?;
    let mut body = text[start + 1..].chars();
    let complete = match body.next() {
        None => false,
        // CSI ends with a byte in `@..=~`; a control char aborts it
        Some('[') => body.any(|c| ('@'..='~').contains(&c) || c < ' '),
        // OSC ends with BEL or ST (whose ESC is found by `rfind` itself)
        Some(']') => body.any(|c| c == '\u{7}'),
        // Charset and similar designators take one more char
        Some(' '..='/') => body.next().is_some(),
        Some(_) => true,
    };
    (!complete).then_some(start)
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new()
    }
}
