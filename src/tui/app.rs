use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use log::{debug, error, info, warn};
use tokio::sync::mpsc;

use crate::commands::catalog::Catalog;
use crate::commands::template::{self, parse_param_types};
use crate::config_file::{Config, ConfigStore};
use crate::console::Console;
use crate::external;
use crate::pty::messages::format_echo;
use crate::pty::{OutputEvent, StopOutcome, SupervisorEvent, TerminalSize};
use crate::remote::{self, RemoteFetchError};

use super::dialog::{ConfirmDialog, DeleteTarget, Dialog, DialogPurpose, FormDialog};
use super::log_state::LogBuffer;
use super::output_state::{LineKind, OutputBuffer};
use super::toolbar;
use super::tree_state::{TreeContext, flatten_catalog};
use super::tree_widget::{NodeKind, VisibleNode};

/// How long a status notice stays visible
pub const NOTICE_DURATION: Duration = Duration::from_millis(3000);

/// Events dispatched to the main application loop
pub enum AppEvent {
    LogUpdated,
    ConfigChanged,
    RemoteLoaded {
        url: String,
        result: Result<Config, RemoteFetchError>,
    },
}

/// Which pane currently has keyboard focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Tree,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// One-line, time-limited status message
#[derive(Debug, Clone)]
pub struct Notice {
    pub text: String,
    pub level: NoticeLevel,
    pub expires_at: Instant,
}

/// The catalog node under the cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Category(String),
    Tool(String),
    Command(String),
}

/// Main application state for the TUI
#[expect(
    clippy::struct_excessive_bools,
    reason = "independent view flags (fullscreen, should_quit, tree_dirty, show_logs, use_internal_terminal)"
)]
pub struct App {
    pub catalog: Catalog,
    pub store: ConfigStore,
    pub use_internal_terminal: bool,
    pub console: Console,
    output_rx: Receiver<OutputEvent>,
    pub output: OutputBuffer,
    pub visible_nodes: Vec<VisibleNode>,
    pub cursor: usize,
    /// Scroll offset for the tree panel (first visible row index)
    pub tree_scroll: usize,
    pub tree_width: u16,
    /// Track which categories and tools are expanded (by id)
    pub(super) expanded: HashMap<String, bool>,
    /// Whether the `visible_nodes` list needs rebuilding
    pub(super) tree_dirty: bool,
    pub focus: Focus,
    pub dialog: Option<Dialog>,
    pub notice: Option<Notice>,
    pub fullscreen: bool,
    pub should_quit: bool,
    /// Whether the log panel is shown instead of the output pane
    pub show_logs: bool,
    pub log_buffer: LogBuffer,
    /// Scroll offset for the log panel (0 = bottom / newest)
    pub log_scroll: usize,
    /// Size of the output pane at the last render
    pub(super) output_size: TerminalSize,
    pub(super) output_height: usize,
    pub event_tx: mpsc::Sender<AppEvent>,
    pub event_rx: mpsc::Receiver<AppEvent>,
}

impl App {
    #[must_use]
    pub fn new(
        catalog: Catalog,
        use_internal_terminal: bool,
        store: ConfigStore,
        mut console: Console,
        log_buffer: LogBuffer,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(256);
        let output_rx = console.subscribe();
        let mut app = App {
            catalog,
            store,
            use_internal_terminal,
            console,
            output_rx,
            output: OutputBuffer::new(),
            visible_nodes: Vec::new(),
            cursor: 0,
            tree_scroll: 0,
            tree_width: 40,
            expanded: HashMap::new(),
            tree_dirty: false,
            focus: Focus::Tree,
            dialog: None,
            notice: None,
            fullscreen: false,
            should_quit: false,
            show_logs: false,
            log_buffer,
            log_scroll: 0,
            output_size: TerminalSize::default(),
            output_height: 0,
            event_tx,
            event_rx,
        };
        app.rebuild_visible_nodes();
        app
    }

    /// Start the shell up front so the first command doesn't wait for it
    pub fn start_shell(&mut self) {
        if !self.use_internal_terminal {
            return;
        }
        if let Err(e) = self.console.start() {
            self.notify(NoticeLevel::Error, format!("{e}"));
        }
    }

    /// Show a status notice for [`NOTICE_DURATION`]
    pub fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
        let text = text.into();
        match level {
            NoticeLevel::Info => info!("{text}"),
            NoticeLevel::Error => error!("{text}"),
        }
        self.notice = Some(Notice {
            text,
            level,
            expires_at: Instant::now() + NOTICE_DURATION,
        });
    }

    /// Mark the tree as needing a rebuild (lazy, happens at next render)
    pub fn mark_tree_dirty(&mut self) {
        self.tree_dirty = true;
    }

    /// Rebuild the flat `visible_nodes` list from the catalog
    pub fn rebuild_visible_nodes(&mut self) {
        self.visible_nodes.clear();
        let mut ctx = TreeContext {
            expanded: &self.expanded,
            nodes: &mut self.visible_nodes,
        };
        flatten_catalog(&self.catalog, &mut ctx);
        self.cursor = self.cursor.min(self.visible_nodes.len().saturating_sub(1));
        self.tree_dirty = false;
    }

    /// Adjust `tree_scroll` so the cursor row is visible within the given height
    pub fn ensure_cursor_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.cursor < self.tree_scroll {
            self.tree_scroll = self.cursor;
        } else if self.cursor >= self.tree_scroll + height {
            self.tree_scroll = self.cursor - height + 1;
        }
    }

    /// Pump shell output, drive the supervisor and expire notices.
    ///
    /// Returns whether anything visible changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if let Some(event) = self.console.tick(now) {
            self.handle_supervisor_event(event);
            changed = true;
        }
        for event in self.output_rx.try_iter() {
            self.output.push_output(&event.text);
            changed = true;
        }
        if self.notice.as_ref().is_some_and(|n| now >= n.expires_at) {
            self.notice = None;
            changed = true;
        }
        changed
    }

    fn handle_supervisor_event(&mut self, event: SupervisorEvent) {
        match event {
            SupervisorEvent::ExitDetected => {
                let backoff = self.console.supervisor().policy().backoff;
                self.output.push_line(LineKind::Notice, "[shell exited]");
                self.notify(
                    NoticeLevel::Info,
                    format!("Shell exited, restarting in {}s", backoff.as_secs()),
                );
            }
            SupervisorEvent::Restarted => {
                self.output.push_line(LineKind::Notice, "[shell restarted]");
                self.notify(NoticeLevel::Info, "Shell restarted");
            }
            SupervisorEvent::RestartFailed(e) => {
                self.notify(NoticeLevel::Error, format!("{e}"));
            }
            SupervisorEvent::GaveUp => {
                self.notify(
                    NoticeLevel::Error,
                    "Shell keeps exiting, automatic restart disabled",
                );
            }
        }
    }

    /// The catalog node under the cursor
    #[must_use]
    pub fn selection(&self) -> Option<Selection> {
        self.visible_nodes
            .get(self.cursor)
            .map(|node| match node.kind {
                NodeKind::Category { .. } => Selection::Category(node.id.clone()),
                NodeKind::Tool { .. } => Selection::Tool(node.id.clone()),
                NodeKind::Command { .. } => Selection::Command(node.id.clone()),
            })
    }

    /// Expand or collapse the node under the cursor; commands have no children
    pub(super) fn set_current_expanded(&mut self, expanded: Option<bool>) {
        let Some(node) = self.visible_nodes.get(self.cursor) else {
            return;
        };
        let current = match node.kind {
            NodeKind::Category { expanded, .. } | NodeKind::Tool { expanded, .. } => expanded,
            NodeKind::Command { .. } => return,
        };
        let target = expanded.unwrap_or(!current);
        if target != current {
            self.expanded.insert(node.id.clone(), target);
            self.mark_tree_dirty();
        }
    }

    /// Run the command under the cursor, asking for parameters first when it has any
    pub fn run_current(&mut self) {
        match self.selection() {
            Some(Selection::Command(id)) => {
                let Some(command) = self.catalog.find_command(&id) else {
                    return;
                };
                if command.parameters().is_empty() {
                    let line = command.template.clone();
                    self.execute(&line);
                } else {
                    self.dialog = Some(Dialog::Form(FormDialog::run_command(command)));
                }
            }
            Some(Selection::Category(_) | Selection::Tool(_)) => self.set_current_expanded(None),
            None => {}
        }
    }

    /// Send a rendered command line to the internal shell or an external terminal
    pub fn execute(&mut self, command_line: &str) {
        if !self.use_internal_terminal {
            match external::launch(command_line) {
                Ok(()) => self.notify(NoticeLevel::Info, "Opened in external terminal"),
                Err(e) => self.notify(NoticeLevel::Error, format!("{e}")),
            }
            return;
        }
        match self.console.dispatch(command_line) {
            Ok(()) => {
                self.output.push_line(LineKind::Echo, &format_echo(command_line));
                self.output.scroll = 0;
            }
            Err(e) => self.notify(NoticeLevel::Error, format!("{e}")),
        }
    }

    pub fn stop_shell(&mut self) {
        match self.console.stop() {
            Ok(StopOutcome::NothingToStop) => {
                self.notify(NoticeLevel::Info, "No shell running");
            }
            Ok(StopOutcome::Terminated) => self.notify(NoticeLevel::Info, "Shell stopped"),
            Ok(StopOutcome::Killed) => self.notify(NoticeLevel::Info, "Shell force-stopped"),
            Err(e) => self.notify(NoticeLevel::Error, format!("{e}")),
        }
    }

    pub fn toggle_terminal_mode(&mut self) {
        self.use_internal_terminal = !self.use_internal_terminal;
        self.persist();
        let mode = if self.use_internal_terminal {
            "internal shell"
        } else {
            "external terminal"
        };
        self.notify(NoticeLevel::Info, format!("Commands now run in the {mode}"));
    }

    /// Open the dialog that adds a child to the node under the cursor
    pub fn begin_add(&mut self) {
        let form = match self.selection() {
            None => FormDialog::add_category(),
            Some(Selection::Category(id)) => FormDialog::add_tool(&id),
            Some(Selection::Tool(id)) => FormDialog::add_command(&id),
            Some(Selection::Command(id)) => match self.catalog.tool_of_command(&id) {
                Some(tool) => FormDialog::add_command(&tool.id),
                None => return,
            },
        };
        self.dialog = Some(Dialog::Form(form));
    }

    pub fn begin_edit(&mut self) {
        let form = match self.selection() {
            Some(Selection::Category(id)) => self
                .catalog
                .find_category(&id)
                .map(|c| FormDialog::rename_category(&c.id, &c.name)),
            Some(Selection::Tool(id)) => self.catalog.find_tool(&id).map(FormDialog::edit_tool),
            Some(Selection::Command(id)) => {
                self.catalog.find_command(&id).map(FormDialog::edit_command)
            }
            None => None,
        };
        if let Some(form) = form {
            self.dialog = Some(Dialog::Form(form));
        }
    }

    pub fn begin_delete(&mut self) {
        let confirm = match self.selection() {
            Some(Selection::Category(id)) => self.catalog.find_category(&id).map(|c| ConfirmDialog {
                message: format!(
                    "Delete category '{}' and its {} tools?",
                    c.name,
                    c.tools.len()
                ),
                target: DeleteTarget::Category(id.clone()),
            }),
            Some(Selection::Tool(id)) => self.catalog.find_tool(&id).map(|t| ConfirmDialog {
                message: format!(
                    "Delete tool '{}' and its {} commands?",
                    t.name,
                    t.commands.len()
                ),
                target: DeleteTarget::Tool(id.clone()),
            }),
            Some(Selection::Command(id)) => self.catalog.find_command(&id).map(|c| ConfirmDialog {
                message: format!("Delete command '{}'?", c.name),
                target: DeleteTarget::Command(id.clone()),
            }),
            None => None,
        };
        if let Some(confirm) = confirm {
            self.dialog = Some(Dialog::Confirm(confirm));
        }
    }

    /// Apply a submitted dialog
    pub(super) fn submit_dialog(&mut self, dialog: Dialog, values: &[String]) {
        match dialog {
            Dialog::Confirm(confirm) => self.confirm_delete(&confirm.target),
            Dialog::Form(form) => self.submit_form(&form.purpose, values),
        }
    }

    fn submit_form(&mut self, purpose: &DialogPurpose, values: &[String]) {
        let field = |i: usize| values.get(i).map_or("", String::as_str);
        let result = match purpose {
            DialogPurpose::AddCategory => self.catalog.add_category(field(0)).map(Some),
            DialogPurpose::RenameCategory { id } => {
                self.catalog.rename_category(id, field(0)).map(|()| None)
            }
            DialogPurpose::AddTool { category_id } => {
                let template = Some(field(2)).filter(|t| !t.trim().is_empty());
                self.catalog
                    .add_tool(category_id, field(0), field(1), template)
                    .map(Some)
            }
            DialogPurpose::EditTool { id } => {
                self.catalog.edit_tool(id, field(0), field(1)).map(|()| None)
            }
            DialogPurpose::AddCommand { tool_id } => match parse_param_types(field(2)) {
                Ok(types) => self
                    .catalog
                    .add_command(tool_id, field(0), field(1), &types)
                    .map(Some),
                Err(e) => {
                    self.notify(NoticeLevel::Error, format!("{e}"));
                    return;
                }
            },
            DialogPurpose::EditCommand { id } => match parse_param_types(field(2)) {
                Ok(types) => self
                    .catalog
                    .edit_command(id, field(0), field(1), &types)
                    .map(|()| None),
                Err(e) => {
                    self.notify(NoticeLevel::Error, format!("{e}"));
                    return;
                }
            },
            DialogPurpose::RunCommand { id } => {
                self.run_with_values(id, values);
                return;
            }
            DialogPurpose::Import => {
                self.import(Path::new(field(0).trim()));
                return;
            }
            DialogPurpose::Export => {
                self.export(Path::new(field(0).trim()));
                return;
            }
            DialogPurpose::RemoteLoad => {
                self.start_remote_load(field(0).trim().to_string());
                return;
            }
        };

        match result {
            Ok(new_id) => {
                self.mark_tree_dirty();
                self.persist();
                if let Some(id) = new_id {
                    self.select_after_rebuild(&id);
                }
                self.notify(NoticeLevel::Info, "Saved");
            }
            Err(e) => self.notify(NoticeLevel::Error, format!("{e}")),
        }
    }

    fn run_with_values(&mut self, id: &str, values: &[String]) {
        let Some(command) = self.catalog.find_command(id) else {
            return;
        };
        let values: HashMap<String, String> = command
            .parameters()
            .into_iter()
            .map(|(name, _)| name)
            .zip(values.iter().cloned())
            .collect();
        let line = template::render(&command.template, &values);
        self.execute(&line);
    }

    fn confirm_delete(&mut self, target: &DeleteTarget) {
        let result = match target {
            DeleteTarget::Category(id) => self.catalog.delete_category(id).map(|c| c.name),
            DeleteTarget::Tool(id) => self.catalog.delete_tool(id).map(|t| t.name),
            DeleteTarget::Command(id) => self.catalog.delete_command(id).map(|c| c.name),
        };
        match result {
            Ok(name) => {
                self.prune_expanded();
                self.mark_tree_dirty();
                self.persist();
                self.notify(NoticeLevel::Info, format!("Deleted '{name}'"));
            }
            Err(e) => self.notify(NoticeLevel::Error, format!("{e}")),
        }
    }

    /// Move the cursor to `id`, expanding its parents
    fn select_after_rebuild(&mut self, id: &str) {
        for category in &self.catalog.categories {
            for tool in &category.tools {
                if tool.id == id || tool.commands.iter().any(|c| c.id == id) {
                    self.expanded.insert(category.id.clone(), true);
                }
                if tool.commands.iter().any(|c| c.id == id) {
                    self.expanded.insert(tool.id.clone(), true);
                }
            }
        }
        self.rebuild_visible_nodes();
        if let Some(index) = self.visible_nodes.iter().position(|n| n.id == id) {
            self.cursor = index;
        }
    }

    #[must_use]
    pub fn current_config(&self) -> Config {
        Config::from_catalog(&self.catalog, self.use_internal_terminal)
    }

    /// Write the catalog to the config file
    pub fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.current_config()) {
            self.notify(NoticeLevel::Error, format!("{e}"));
        }
    }

    /// Replace the whole catalog, e.g. after an import or remote load
    pub fn apply_config(&mut self, config: Config) {
        let (catalog, use_internal_terminal) = config.into_catalog();
        crate::validate_catalog(&catalog);
        self.catalog = catalog;
        self.use_internal_terminal = use_internal_terminal;
        // Ids are regenerated on load, so old expansion state no longer applies
        self.expanded.clear();
        self.cursor = 0;
        self.tree_scroll = 0;
        self.rebuild_visible_nodes();
    }

    pub fn import(&mut self, source: &Path) {
        match self.store.import(source) {
            Ok(config) => {
                let count = config.categories.len();
                self.apply_config(config);
                self.notify(
                    NoticeLevel::Info,
                    format!("Imported {count} categories from {}", source.display()),
                );
            }
            Err(e) => self.notify(NoticeLevel::Error, format!("{e}")),
        }
    }

    pub fn export(&mut self, target: &Path) {
        match ConfigStore::export(&self.current_config(), target) {
            Ok(()) => self.notify(
                NoticeLevel::Info,
                format!("Exported configuration to {}", target.display()),
            ),
            Err(e) => self.notify(NoticeLevel::Error, format!("{e}")),
        }
    }

    /// Fetch a remote configuration in the background; the result arrives as an `AppEvent`
    pub fn start_remote_load(&mut self, url: String) {
        if url.is_empty() {
            return;
        }
        self.notify(NoticeLevel::Info, format!("Loading {url}…"));
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = remote::fetch_config(&url).await;
            if tx.send(AppEvent::RemoteLoaded { url, result }).await.is_err() {
                debug!("App closed before remote config arrived");
            }
        });
    }

    /// Reload after an external edit; our own saves are recognised and skipped
    fn reload_config(&mut self) {
        let path = self.store.path().to_path_buf();
        match Config::from_file(&path) {
            Ok(config) => {
                let unchanged = match (config.to_json(), self.current_config().to_json()) {
                    (Ok(on_disk), Ok(in_memory)) => on_disk == in_memory,
                    _ => false,
                };
                if unchanged {
                    debug!("Config file matches in-memory catalog, not reloading");
                    return;
                }
                self.apply_config(config);
                info!("Configuration reloaded from {}", path.display());
            }
            Err(e) => warn!("Failed to reload config: {e}"),
        }
    }

    /// Handle app events (called from event loop)
    pub fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::LogUpdated => {
                // Redraw happens automatically on next frame
            }
            AppEvent::ConfigChanged => self.reload_config(),
            AppEvent::RemoteLoaded { url, result } => match result {
                Ok(config) => {
                    let count = config.categories.len();
                    self.apply_config(config);
                    self.persist();
                    self.notify(
                        NoticeLevel::Info,
                        format!("Loaded {count} categories from {url}"),
                    );
                }
                Err(e) => self.notify(NoticeLevel::Error, format!("{e}")),
            },
        }
    }

    /// Resize the shell's PTY to match the output pane
    pub(super) fn sync_output_size(&mut self, cols: u16, rows: u16) {
        self.output_height = rows as usize;
        let size = TerminalSize::new(cols.max(1), rows.max(1));
        if size == self.output_size {
            return;
        }
        self.output_size = size;
        if let Err(e) = self.console.resize(size) {
            debug!("Failed to resize shell: {e}");
        }
    }

    /// Ids of every node currently in the catalog
    fn known_ids(&self) -> HashSet<&str> {
        self.catalog
            .categories
            .iter()
            .flat_map(|c| {
                std::iter::once(c.id.as_str()).chain(c.tools.iter().flat_map(|t| {
                    std::iter::once(t.id.as_str()).chain(t.commands.iter().map(|cmd| cmd.id.as_str()))
                }))
            })
            .collect()
    }

    /// Drop expansion state for nodes that no longer exist
    pub(super) fn prune_expanded(&mut self) {
        let known: HashSet<String> = self.known_ids().into_iter().map(str::to_string).collect();
        self.expanded.retain(|id, _| known.contains(id));
    }

    pub(super) fn execute_toolbar_action(&mut self, action: toolbar::ToolbarAction) {
        use toolbar::ToolbarAction;
        match action {
            ToolbarAction::Toggle => self.set_current_expanded(None),
            ToolbarAction::Run => self.run_current(),
            ToolbarAction::AddChild => self.begin_add(),
            ToolbarAction::AddCategory => {
                self.dialog = Some(Dialog::Form(FormDialog::add_category()));
            }
            ToolbarAction::Edit => self.begin_edit(),
            ToolbarAction::Delete => self.begin_delete(),
            ToolbarAction::StopShell => self.stop_shell(),
            ToolbarAction::ToggleTerminalMode => self.toggle_terminal_mode(),
            ToolbarAction::Import => self.dialog = Some(Dialog::Form(FormDialog::import())),
            ToolbarAction::Export => self.dialog = Some(Dialog::Form(FormDialog::export())),
            ToolbarAction::RemoteLoad => {
                self.dialog = Some(Dialog::Form(FormDialog::remote_load()));
            }
            ToolbarAction::ToggleFullscreen => self.fullscreen = !self.fullscreen,
            ToolbarAction::FocusInput => self.focus = Focus::Input,
            ToolbarAction::BackToTree => {
                self.focus = Focus::Tree;
                self.fullscreen = false;
            }
            ToolbarAction::ToggleLogs => {
                self.show_logs = !self.show_logs;
                self.log_scroll = 0;
            }
            ToolbarAction::Quit => self.should_quit = true,
        }
    }
}

/// An app over a temporary config file holding `json`, with `cat` as its shell
#[cfg(test)]
pub(super) fn test_app(json: &str) -> (App, tempfile::TempDir) {
    use crate::pty::{RestartPolicy, ShellProgram};

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("commands.json");
    std::fs::write(&path, json).unwrap();
    let store = ConfigStore::new(path);
    let (config, _) = store.load().unwrap();
    let (catalog, internal) = config.into_catalog();
    let console = Console::new(
        ShellProgram::new("cat", &[]),
        TerminalSize::default(),
        RestartPolicy::default(),
    );
    let app = App::new(catalog, internal, store, console, LogBuffer::new());
    (app, dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::tree_widget::render_node_text;

    fn app_with(json: &str) -> (App, tempfile::TempDir) {
        test_app(json)
    }

    const SAMPLE: &str = r#"{"categories": [{"name": "net", "tools": [
        {"name": "ping", "commands": [
            {"name": "once", "template": "ping -c 1 {host}", "param_types": {"host": "字符串"}},
            {"name": "uptime", "template": "uptime"}
        ]}
    ]}], "use_internal_terminal": true}"#;

    fn tree(app: &mut App) -> Vec<String> {
        app.rebuild_visible_nodes();
        app.visible_nodes.iter().map(render_node_text).collect()
    }

    #[test]
    fn test_run_command_with_parameters_opens_form() {
        let (mut app, _dir) = app_with(SAMPLE);
        app.cursor = 2;
        app.run_current();
        let Some(Dialog::Form(form)) = &app.dialog else {
            panic!("expected a form");
        };
        assert!(matches!(form.purpose, DialogPurpose::RunCommand { .. }));
        assert_eq!(form.fields.len(), 1);
    }

    #[test]
    fn test_add_category_persists() {
        let (mut app, _dir) = app_with(SAMPLE);
        app.submit_form(&DialogPurpose::AddCategory, &["files".to_string()]);
        assert_eq!(tree(&mut app).last().unwrap(), "▼ files (0)");

        let saved = Config::from_file(app.store.path()).unwrap();
        assert_eq!(saved.categories.len(), 2);
        assert_eq!(saved.categories[1].name, "files");
    }

    #[test]
    fn test_invalid_param_types_are_reported() {
        let (mut app, _dir) = app_with(SAMPLE);
        let tool_id = app.catalog.categories[0].tools[0].id.clone();
        app.submit_form(
            &DialogPurpose::AddCommand { tool_id },
            &["x".to_string(), "cat {f}".to_string(), "f=folder".to_string()],
        );
        let notice = app.notice.as_ref().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(app.catalog.command_count(), 2);
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let (mut app, _dir) = app_with(SAMPLE);
        app.cursor = 1;
        app.begin_delete();
        let Some(dialog) = app.dialog.take() else {
            panic!("expected a confirmation");
        };
        app.submit_dialog(dialog, &[]);
        assert_eq!(tree(&mut app), ["▼ net (0)"]);
    }

    #[test]
    fn test_own_save_does_not_reload() {
        let (mut app, _dir) = app_with(SAMPLE);
        let category_id = app.catalog.categories[0].id.clone();
        app.expanded.insert(category_id.clone(), false);
        app.persist();
        app.handle_app_event(AppEvent::ConfigChanged);
        // A reload would have regenerated ids
        assert_eq!(app.catalog.categories[0].id, category_id);
    }

    #[test]
    fn test_external_edit_reloads() {
        let (mut app, _dir) = app_with(SAMPLE);
        std::fs::write(app.store.path(), r#"[{"name": "other"}]"#).unwrap();
        app.handle_app_event(AppEvent::ConfigChanged);
        assert_eq!(tree(&mut app), ["▼ other (0)"]);
    }

    #[test]
    fn test_notice_expires() {
        let (mut app, _dir) = app_with(SAMPLE);
        app.notify(NoticeLevel::Info, "hello");
        let expiry = app.notice.as_ref().unwrap().expires_at;
        app.tick(expiry - Duration::from_millis(1));
        assert!(app.notice.is_some());
        app.tick(expiry);
        assert!(app.notice.is_none());
    }

    #[test]
    fn test_prune_expanded() {
        let (mut app, _dir) = app_with(SAMPLE);
        app.expanded.insert("gone".to_string(), false);
        let tool_id = app.catalog.categories[0].tools[0].id.clone();
        app.expanded.insert(tool_id.clone(), false);
        app.prune_expanded();
        assert_eq!(app.expanded.len(), 1);
        assert!(app.expanded.contains_key(&tool_id));
    }
}
