use std::io;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use futures::StreamExt;
use log::{debug, error, info, warn};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use tooldeck::config_file::LoadOutcome;
use tooldeck::console::Console;
use tooldeck::load_catalog;
use tooldeck::logger::{self, LogTarget};
use tooldeck::pty::{RestartPolicy, ShellProgram, TerminalSize};
use tooldeck::tui::app::{App, AppEvent, NoticeLevel};
use tooldeck::tui::log_state::LogBuffer;

/// Start a config file watcher that sends `ConfigChanged` events with manual 1s debounce.
fn start_config_watcher(
    config_path: &Path,
    event_tx: tokio::sync::mpsc::Sender<AppEvent>,
) -> Option<Box<dyn notify::Watcher>> {
    use notify::{EventKind, RecursiveMode, Watcher};

    let last_reload = Arc::new(parking_lot::Mutex::new(Instant::now()));

    match notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        {
            let mut last = last_reload.lock();
            if last.elapsed().as_secs() >= 1 {
                *last = Instant::now();
                let _ = event_tx.blocking_send(AppEvent::ConfigChanged);
            }
        }
    }) {
        Ok(mut watcher) => {
            if let Err(e) = watcher.watch(config_path, RecursiveMode::NonRecursive) {
                warn!("Config file watcher not started: {e}");
                None
            } else {
                info!("Config file watcher started for {}", config_path.display());
                Some(Box::new(watcher))
            }
        }
        Err(e) => {
            warn!("Config file watcher not started: {e}");
            None
        }
    }
}

/// Launch the interactive TUI.
///
/// # Errors
///
/// Returns an error if the config cannot be created, or terminal setup or the
/// event loop fails.
pub async fn run(
    config_file: Option<&str>,
    log_file: Option<std::fs::File>,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Initialize the log buffer and custom logger
    let log_buffer = LogBuffer::new();
    logger::init(LogTarget::Panel(log_buffer.clone()), log_file);

    let loaded = load_catalog(config_file)?;
    let config_path = loaded.store.path().to_path_buf();

    // Install panic hook that restores the terminal before printing the panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let console = Console::new(
        ShellProgram::platform_default(),
        TerminalSize::default(),
        RestartPolicy::default(),
    );
    let mut app = App::new(
        loaded.catalog,
        loaded.use_internal_terminal,
        loaded.store,
        console,
        log_buffer,
    );
    match loaded.outcome {
        LoadOutcome::Loaded => {}
        LoadOutcome::Created => app.notify(
            NoticeLevel::Info,
            format!("Created {}", config_path.display()),
        ),
        LoadOutcome::Fallback(e) => app.notify(NoticeLevel::Error, format!("{e}")),
    }
    app.start_shell();

    // Connect the logger to the app's event channel for redraw notifications
    logger::connect_event_sender(app.event_tx.clone());

    let config_watcher_handle = start_config_watcher(&config_path, app.event_tx.clone());

    // Main event loop
    let result = run_event_loop(&mut terminal, &mut app).await;

    // Shutdown: stop the shell before leaving the alternate screen
    if let Err(e) = app.console.stop() {
        debug!("Failed to stop shell on exit: {e}");
    }
    drop(config_watcher_handle);

    // Cleanup terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        error!("Application error: {e}");
        eprintln!("Error: {e}");
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut event_stream = EventStream::new();
    let mut needs_render = true;

    // Frame rate limiter and shell pump: ~60 FPS max
    let mut tick = tokio::time::interval(Duration::from_millis(16));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        if needs_render {
            terminal.draw(|frame| app.render(frame))?;
            needs_render = false;
        }

        if app.should_quit {
            break;
        }

        tokio::select! {
            _ = tick.tick() => {
                if app.tick(Instant::now()) {
                    needs_render = true;
                }
            }
            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind != KeyEventKind::Release => {
                        needs_render = true;
                        app.handle_key(key);
                    }
                    Some(Ok(Event::Resize(_w, _h))) => {
                        needs_render = true;
                    }
                    Some(Err(e)) => {
                        error!("Event error: {e}");
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }
            // App events (log updates, config reloads, remote loads)
            maybe_app_event = app.event_rx.recv() => {
                needs_render = true;
                if let Some(app_event) = maybe_app_event {
                    app.handle_app_event(app_event);
                }
            }
            // Handle Ctrl+C even if crossterm misses it
            _ = tokio::signal::ctrl_c() => {
                debug!("Received Ctrl+C signal");
                break;
            }
        }
    }

    Ok(())
}
