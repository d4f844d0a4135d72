use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::commands::catalog::{CommandTemplate, Tool};
use crate::commands::template::{ParamKind, format_param_types};
use crate::theme;

/// What a submitted form is for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogPurpose {
    AddCategory,
    RenameCategory { id: String },
    AddTool { category_id: String },
    EditTool { id: String },
    AddCommand { tool_id: String },
    EditCommand { id: String },
    RunCommand { id: String },
    Import,
    Export,
    RemoteLoad,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub label: String,
    pub value: String,
    pub hint: Option<String>,
}

impl FormField {
    fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            hint: None,
        }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// A modal list of single-line text fields
#[derive(Debug, Clone)]
pub struct FormDialog {
    pub title: String,
    pub purpose: DialogPurpose,
    pub fields: Vec<FormField>,
    pub focused: usize,
}

/// A yes/no question guarding a destructive action
#[derive(Debug, Clone)]
pub struct ConfirmDialog {
    pub message: String,
    pub target: DeleteTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Category(String),
    Tool(String),
    Command(String),
}

#[derive(Debug, Clone)]
pub enum Dialog {
    Form(FormDialog),
    Confirm(ConfirmDialog),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogOutcome {
    Pending,
    Cancelled,
    /// Field values in order (empty for a confirmation)
    Submitted(Vec<String>),
}

const PARAM_TYPES_HINT: &str = "name=string|file|file_or_string, ...";

impl FormDialog {
    fn new(title: impl Into<String>, purpose: DialogPurpose, fields: Vec<FormField>) -> Self {
        Self {
            title: title.into(),
            purpose,
            fields,
            focused: 0,
        }
    }

    #[must_use]
    pub fn add_category() -> Self {
        Self::new(
            "Add category",
            DialogPurpose::AddCategory,
            vec![FormField::new("Name", "")],
        )
    }

    #[must_use]
    pub fn rename_category(id: &str, name: &str) -> Self {
        Self::new(
            "Rename category",
            DialogPurpose::RenameCategory { id: id.to_string() },
            vec![FormField::new("Name", name)],
        )
    }

    #[must_use]
    pub fn add_tool(category_id: &str) -> Self {
        Self::new(
            "Add tool",
            DialogPurpose::AddTool {
                category_id: category_id.to_string(),
            },
            vec![
                FormField::new("Name", ""),
                FormField::new("Description", ""),
                FormField::new("Template", "")
                    .with_hint("optional, creates a command named after the tool"),
            ],
        )
    }

    #[must_use]
    pub fn edit_tool(tool: &Tool) -> Self {
        Self::new(
            "Edit tool",
            DialogPurpose::EditTool {
                id: tool.id.clone(),
            },
            vec![
                FormField::new("Name", tool.name.as_str()),
                FormField::new("Description", tool.description.as_str()),
            ],
        )
    }

    #[must_use]
    pub fn add_command(tool_id: &str) -> Self {
        Self::new(
            "Add command",
            DialogPurpose::AddCommand {
                tool_id: tool_id.to_string(),
            },
            vec![
                FormField::new("Name", ""),
                FormField::new("Template", "").with_hint("use {name} for parameters"),
                FormField::new("Parameter types", "").with_hint(PARAM_TYPES_HINT),
            ],
        )
    }

    #[must_use]
    pub fn edit_command(command: &CommandTemplate) -> Self {
        Self::new(
            "Edit command",
            DialogPurpose::EditCommand {
                id: command.id.clone(),
            },
            vec![
                FormField::new("Name", command.name.as_str()),
                FormField::new("Template", command.template.as_str())
                    .with_hint("use {name} for parameters"),
                FormField::new("Parameter types", format_param_types(&command.param_types))
                    .with_hint(PARAM_TYPES_HINT),
            ],
        )
    }

    /// One field per distinct parameter, labelled with its kind
    #[must_use]
    pub fn run_command(command: &CommandTemplate) -> Self {
        let fields = command
            .parameters()
            .into_iter()
            .map(|(name, kind)| {
                let field = FormField::new(format!("{name} ({kind})"), "");
                match kind {
                    ParamKind::String => field,
                    ParamKind::File => field.with_hint("path to a file"),
                    ParamKind::FileOrString => field.with_hint("path to a file, or plain text"),
                }
            })
            .collect();
        Self::new(
            format!("Run {}", command.name),
            DialogPurpose::RunCommand {
                id: command.id.clone(),
            },
            fields,
        )
    }

    #[must_use]
    pub fn import() -> Self {
        Self::new(
            "Import configuration",
            DialogPurpose::Import,
            vec![FormField::new("File", "")],
        )
    }

    #[must_use]
    pub fn export() -> Self {
        Self::new(
            "Export configuration",
            DialogPurpose::Export,
            vec![FormField::new("File", "commands_export.json")],
        )
    }

    #[must_use]
    pub fn remote_load() -> Self {
        Self::new(
            "Load remote configuration",
            DialogPurpose::RemoteLoad,
            vec![FormField::new("URL", "https://")],
        )
    }

    fn focus_next(&mut self) {
        if !self.fields.is_empty() {
            self.focused = (self.focused + 1) % self.fields.len();
        }
    }

    fn focus_previous(&mut self) {
        if !self.fields.is_empty() {
            self.focused = (self.focused + self.fields.len() - 1) % self.fields.len();
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> DialogOutcome {
        match key.code {
            KeyCode::Esc => return DialogOutcome::Cancelled,
            KeyCode::Enter => {
                if self.focused + 1 < self.fields.len() {
                    self.focus_next();
                } else {
                    return DialogOutcome::Submitted(
                        self.fields.iter().map(|f| f.value.clone()).collect(),
                    );
                }
            }
            KeyCode::Tab | KeyCode::Down => self.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.focus_previous(),
            KeyCode::Backspace => {
                if let Some(field) = self.fields.get_mut(self.focused) {
                    field.value.pop();
                }
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Some(field) = self.fields.get_mut(self.focused) {
                    field.value.clear();
                }
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Some(field) = self.fields.get_mut(self.focused) {
                    field.value.push(c);
                }
            }
            _ => {}
        }
        DialogOutcome::Pending
    }
}

impl Dialog {
    /// Feed a key to the dialog
    pub fn handle_key(&mut self, key: KeyEvent) -> DialogOutcome {
        match self {
            Dialog::Form(form) => form.handle_key(key),
            Dialog::Confirm(_) => match key.code {
                KeyCode::Char('y' | 'Y') | KeyCode::Enter => DialogOutcome::Submitted(Vec::new()),
                KeyCode::Char('n' | 'N') | KeyCode::Esc => DialogOutcome::Cancelled,
                _ => DialogOutcome::Pending,
            },
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        match self {
            Dialog::Form(form) => render_form(form, frame, area),
            Dialog::Confirm(confirm) => render_confirm(confirm, frame, area),
        }
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn dialog_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::DIALOG_BORDER))
        .title(Span::styled(
            format!(" {title} "),
            Style::default()
                .fg(theme::ACCENT)
                .add_modifier(Modifier::BOLD),
        ))
}

fn render_form(form: &FormDialog, frame: &mut Frame, area: Rect) {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "forms have a handful of fields"
    )]
    let height = (form.fields.len() as u16) * 3 + 3;
    let rect = centered(area, 70, height);
    frame.render_widget(Clear, rect);
    let block = dialog_block(&form.title);
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    let mut constraints: Vec<Constraint> =
        form.fields.iter().map(|_| Constraint::Length(3)).collect();
    constraints.push(Constraint::Length(1));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(inner);

    for (i, field) in form.fields.iter().enumerate() {
        let focused = i == form.focused;
        let label_style = if focused {
            Style::default().fg(theme::ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let mut label = vec![Span::styled(field.label.as_str(), label_style)];
        if let Some(hint) = &field.hint {
            label.push(Span::styled(
                format!("  {hint}"),
                Style::default().fg(theme::DIM),
            ));
        }
        let cursor = if focused { "█" } else { "" };
        let lines = vec![
            Line::from(label),
            Line::from(vec![
                Span::raw(field.value.as_str()),
                Span::styled(cursor, Style::default().fg(theme::ACCENT)),
            ])
            .style(Style::default().bg(theme::DIALOG_FIELD_BG)),
        ];
        frame.render_widget(Paragraph::new(lines), rows[i]);
    }

    let footer = Line::from(Span::styled(
        "enter next/submit · tab switch field · esc cancel",
        Style::default().fg(theme::DIM),
    ));
    frame.render_widget(Paragraph::new(footer), rows[form.fields.len()]);
}

fn render_confirm(confirm: &ConfirmDialog, frame: &mut Frame, area: Rect) {
    let rect = centered(area, 60, 5);
    frame.render_widget(Clear, rect);
    let block = dialog_block("Confirm");
    let inner = block.inner(rect);
    frame.render_widget(block, rect);
    let lines = vec![
        Line::from(confirm.message.as_str()),
        Line::from(Span::styled(
            "y confirm · n cancel",
            Style::default().fg(theme::DIM),
        )),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
}
