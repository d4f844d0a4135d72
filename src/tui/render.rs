use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState};

use super::app::{App, Focus, NoticeLevel};
use super::output_state::LineKind;
use super::toolbar;
use super::tree_widget::TreeWidget;
use crate::input::PROMPT;
use crate::pty::SessionState;
use crate::{logger, theme};

fn render_scrollbar(frame: &mut Frame, area: Rect, total: usize, position: usize) {
    let mut state = ScrollbarState::new(total).position(position);
    frame.render_stateful_widget(
        Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .thumb_style(Style::default().fg(theme::ACCENT)),
        area,
        &mut state,
    );
}

fn state_color(state: SessionState) -> Color {
    match state {
        SessionState::Running => theme::SUCCESS,
        SessionState::Terminating => theme::RUNNING,
        SessionState::Exited => theme::FAILURE,
        SessionState::NotStarted => theme::DIM,
    }
}

impl App {
    /// Render the app
    pub fn render(&mut self, frame: &mut Frame) {
        if self.tree_dirty {
            self.rebuild_visible_nodes();
        }
        let size = frame.area();

        // Outer vertical split: main area + status line + toolbar
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(size);

        let main_area = outer[0];
        let status_area = outer[1];
        let toolbar_area = outer[2];

        frame.render_widget(
            Paragraph::new(toolbar::build_toolbar_line(self, toolbar_area.width)),
            toolbar_area,
        );
        self.render_status(frame, status_area);

        if self.fullscreen {
            self.render_right_pane(frame, main_area);
        } else {
            // Split into tree and output panels
            let tree_width = self.tree_width.min(main_area.width.saturating_sub(20));
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Length(tree_width),
                    Constraint::Length(1), // separator
                    Constraint::Min(20),
                ])
                .split(main_area);

            let tree_area = chunks[0];
            let separator_area = chunks[1];

            // Render tree (ensure cursor is visible within the panel height)
            self.ensure_cursor_visible(tree_area.height as usize);
            let tree_widget = TreeWidget::new(
                &self.visible_nodes,
                self.cursor,
                self.tree_scroll,
                self.focus == Focus::Tree && self.dialog.is_none(),
            );
            frame.render_widget(tree_widget, tree_area);

            let separator_lines: Vec<Line> = (0..separator_area.height)
                .map(|_| Line::from(Span::styled("│", Style::default().fg(theme::ACCENT))))
                .collect();
            frame.render_widget(Paragraph::new(separator_lines), separator_area);

            self.render_right_pane(frame, chunks[2]);
        }

        if let Some(dialog) = &self.dialog {
            dialog.render(frame, size);
        }
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let line = match &self.notice {
            Some(notice) => {
                let color = match notice.level {
                    NoticeLevel::Info => theme::ACCENT,
                    NoticeLevel::Error => theme::FAILURE,
                };
                Line::from(Span::styled(
                    format!(" {}", notice.text),
                    Style::default().fg(color),
                ))
            }
            None => Line::from(Span::styled(
                format!(
                    " {} commands in {} categories",
                    self.catalog.command_count(),
                    self.catalog.categories.len()
                ),
                Style::default().fg(theme::DIM),
            )),
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    /// Header, output (or logs) and the input line
    fn render_right_pane(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(area);

        let header_area = chunks[0];
        let content_area = chunks[1];
        let input_area = chunks[2];

        self.sync_output_size(content_area.width, content_area.height);

        if self.show_logs {
            self.render_log_panel(frame, header_area, content_area);
        } else {
            self.render_output(frame, header_area, content_area);
        }
        self.render_input(frame, input_area);
    }

    fn render_output(&self, frame: &mut Frame, header_area: Rect, area: Rect) {
        let session = self.console.session();
        let state = session.state();
        let mut header = vec![
            Span::styled(
                " Shell ",
                Style::default()
                    .fg(theme::ACCENT)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(state.to_string(), Style::default().fg(state_color(state))),
            Span::styled(
                format!("  {}", session.program()),
                Style::default().fg(theme::DIM),
            ),
        ];
        if !self.use_internal_terminal {
            header.push(Span::styled(
                "  (commands open in an external terminal)",
                Style::default().fg(theme::DIM),
            ));
        }
        frame.render_widget(Paragraph::new(Line::from(header)), header_area);

        if self.output.is_empty() {
            let placeholder = Paragraph::new("No output yet. Press Enter on a command to run it.")
                .style(Style::default().fg(theme::DIM));
            frame.render_widget(placeholder, area);
            return;
        }

        let height = area.height as usize;
        let lines: Vec<Line> = self
            .output
            .visible(height)
            .into_iter()
            .map(|line| match line.kind {
                LineKind::Shell => Line::raw(line.text),
                LineKind::Echo => Line::styled(
                    line.text,
                    Style::default().fg(theme::ECHO).add_modifier(Modifier::BOLD),
                ),
                LineKind::Notice => Line::styled(
                    line.text,
                    Style::default()
                        .fg(theme::DIM)
                        .add_modifier(Modifier::ITALIC),
                ),
            })
            .collect();
        frame.render_widget(Paragraph::new(lines), area);

        let total = self.output.len();
        if total > height {
            let max_scroll = total - height;
            let scroll = self.output.scroll.min(max_scroll);
            render_scrollbar(frame, area, max_scroll, max_scroll - scroll);
        }
    }

    fn render_input(&self, frame: &mut Frame, area: Rect) {
        let line = self.console.input().line();
        let focused = self.focus == Focus::Input && self.dialog.is_none();
        let prompt_style = if focused {
            Style::default()
                .fg(theme::ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme::DIM)
        };
        let input = Line::from(vec![
            Span::styled(PROMPT, prompt_style),
            Span::raw(line.text()),
        ]);
        frame.render_widget(Paragraph::new(input), area);

        if focused {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "cursor column is clamped to the input width"
            )]
            let column = (PROMPT.chars().count() + line.cursor_column())
                .min(area.width.saturating_sub(1) as usize) as u16;
            frame.set_cursor_position(Position::new(area.x + column, area.y));
        }
    }

    fn render_log_panel(&self, frame: &mut Frame, header_area: Rect, area: Rect) {
        let entries = self.log_buffer.entries();
        let count = entries.len();

        let header = Line::from(vec![Span::styled(
            format!(" Logs ({count}) "),
            Style::default()
                .fg(theme::ACCENT)
                .add_modifier(Modifier::BOLD),
        )]);
        frame.render_widget(Paragraph::new(header), header_area);

        if entries.is_empty() {
            let empty =
                Paragraph::new("No log messages yet.").style(Style::default().fg(theme::DIM));
            frame.render_widget(empty, area);
            return;
        }

        let visible_height = area.height as usize;
        let max_scroll = count.saturating_sub(visible_height);
        let scroll = self.log_scroll.min(max_scroll);

        // Show entries from bottom (newest last), scrolled up by `scroll`
        let start = count.saturating_sub(visible_height + scroll);
        let end = count.saturating_sub(scroll);

        let log_start = self.log_buffer.start();
        let lines: Vec<Line> = entries[start..end]
            .iter()
            .map(|entry| {
                let elapsed = entry.timestamp.duration_since(log_start).as_secs_f64();
                Line::from(vec![
                    Span::styled(format!("{elapsed:>6.1}s "), Style::default().fg(theme::DIM)),
                    Span::styled(
                        format!("{:5}", entry.level),
                        Style::default().fg(logger::level_color(entry.level)),
                    ),
                    Span::raw(" "),
                    Span::styled(format!("{}: ", entry.target), Style::default().fg(theme::DIM)),
                    Span::raw(entry.message.as_str()),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines), area);

        if count > visible_height {
            render_scrollbar(frame, area, max_scroll, max_scroll - scroll);
        }
    }
}

#[cfg(test)]
mod tests {
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    use super::super::app::{NoticeLevel, test_app};
    use super::super::output_state::LineKind;

    fn screen(terminal: &Terminal<TestBackend>) -> Vec<String> {
        let buffer = terminal.backend().buffer();
        let area = buffer.area;
        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buffer[(x, y)].symbol().to_string())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect()
    }

    const CATALOG: &str = r#"[{"name": "net", "tools": [{"name": "ping", "commands": [
        {"name": "uptime", "template": "uptime"}
    ]}]}]"#;

    #[test]
    fn test_layout_shows_tree_output_and_notice() {
        let (mut app, _dir) = test_app(CATALOG);
        app.tree_width = 30;
        app.output.push_line(LineKind::Echo, "> uptime");
        app.output.push_output("up 3 days\n");
        app.notify(NoticeLevel::Info, "Saved");

        let mut terminal = Terminal::new(TestBackend::new(80, 8)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        let rows = screen(&terminal);

        assert!(rows[0].starts_with("▼ net (1)"));
        assert!(rows[0].contains("│ Shell not started"));
        assert!(rows[1].starts_with("└─▼ ping (1)"));
        assert!(rows[1].ends_with("│> uptime"));
        assert!(rows[2].ends_with("│up 3 days"));
        assert!(rows[5].ends_with("│>"));
        assert_eq!(rows[6], " Saved");
    }

    #[test]
    fn test_render_resizes_console_to_output_area() {
        let (mut app, _dir) = test_app(CATALOG);
        app.tree_width = 30;
        let mut terminal = Terminal::new(TestBackend::new(80, 10)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        // 80 - 30 tree - 1 separator; 10 - status - toolbar - header - input
        assert_eq!(app.output_size, crate::pty::TerminalSize::new(49, 6));
    }
}
