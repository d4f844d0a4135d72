use std::io::Write;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use log::{Level, Log, Metadata, Record};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::tui::app::AppEvent;
use crate::tui::log_state::{LogBuffer, LogEntry};

/// Slot for the app event sender, connected after `App` is created.
type EventSlot = Arc<Mutex<Option<mpsc::Sender<AppEvent>>>>;

static EVENT_SLOT: OnceLock<EventSlot> = OnceLock::new();

/// Least severe level echoed to stderr by `LogTarget::Stderr`
const STDERR_LEVEL: Level = Level::Warn;

/// Connect the logger to the app event loop so it can trigger redraws.
pub fn connect_event_sender(tx: mpsc::Sender<AppEvent>) {
    if let Some(slot) = EVENT_SLOT.get() {
        *slot.lock() = Some(tx);
    }
}

/// Where log records end up
pub enum LogTarget {
    /// The TUI log panel
    Panel(LogBuffer),
    /// Standard error, warnings and errors only (CLI subcommands).
    /// The log file still receives every enabled record.
    Stderr,
}

struct TooldeckLogger {
    target: LogTarget,
    file: Option<Mutex<std::fs::File>>,
    filter: log::LevelFilter,
    start: Instant,
}

impl Log for TooldeckLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let now = Instant::now();
        match &self.target {
            LogTarget::Panel(buffer) => {
                buffer.push(LogEntry {
                    level: record.level(),
                    target: record.target().to_string(),
                    message: format!("{}", record.args()),
                    timestamp: now,
                });
                if let Some(slot) = EVENT_SLOT.get()
                    && let Some(ref tx) = *slot.lock()
                {
                    let _ = tx.try_send(AppEvent::LogUpdated);
                }
            }
            LogTarget::Stderr => {
                if record.level() <= STDERR_LEVEL {
                    eprintln!("{}: {}", record.level(), record.args());
                }
            }
        }

        if let Some(ref file) = self.file {
            let elapsed = now.duration_since(self.start).as_secs_f64();
            let _ = writeln!(
                file.lock(),
                "[{elapsed:.3}s] [{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        if let Some(ref file) = self.file {
            let _ = file.lock().flush();
        }
    }
}

/// Initialize the global logger. Only the first call takes effect.
pub fn init(target: LogTarget, log_file: Option<std::fs::File>) {
    EVENT_SLOT.get_or_init(|| Arc::new(Mutex::new(None)));

    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(log::LevelFilter::Info);

    let logger = TooldeckLogger {
        target,
        file: log_file.map(Mutex::new),
        filter,
        start: Instant::now(),
    };

    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(filter);
    }
}

/// Map a log level to a ratatui color for display.
#[must_use]
pub fn level_color(level: Level) -> ratatui::style::Color {
    match level {
        Level::Error => crate::theme::FAILURE,
        Level::Warn => crate::theme::RUNNING,
        Level::Info => ratatui::style::Color::Blue,
        Level::Debug | Level::Trace => crate::theme::DIM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_target_writes_every_record_to_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let logger = TooldeckLogger {
            target: LogTarget::Stderr,
            file: Some(Mutex::new(file.reopen().unwrap())),
            filter: log::LevelFilter::Info,
            start: Instant::now(),
        };

        let records = [
            (Level::Info, "saved"),
            (Level::Warn, "slow"),
            (Level::Debug, "noise"),
        ];
        for (level, message) in records {
            logger.log(
                &Record::builder()
                    .args(format_args!("{message}"))
                    .level(level)
                    .target("tooldeck")
                    .build(),
            );
        }
        logger.flush();

        let written = std::fs::read_to_string(file.path()).unwrap();
        assert!(written.contains("[INFO] tooldeck: saved"), "{written}");
        assert!(written.contains("[WARN] tooldeck: slow"), "{written}");
        assert!(!written.contains("noise"), "{written}");
    }
}
