use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use log::Level;
use parking_lot::Mutex;

const MAX_LOG_ENTRIES: usize = 1000;

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub timestamp: Instant,
}

#[derive(Debug)]
struct Entries {
    items: VecDeque<LogEntry>,
    /// Total pushes so far; lets readers tell whether anything changed
    pushed: u64,
}

/// Thread-safe ring buffer for log entries, shared between the logger and the log panel.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    entries: Arc<Mutex<Entries>>,
    capacity: usize,
    start: Instant,
}

impl LogBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_LOG_ENTRIES)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Entries {
                items: VecDeque::with_capacity(capacity),
                pushed: 0,
            })),
            capacity: capacity.max(1),
            start: Instant::now(),
        }
    }

    #[must_use]
    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn push(&self, entry: LogEntry) {
        let mut entries = self.entries.lock();
        if entries.items.len() >= self.capacity {
            entries.items.pop_front();
        }
        entries.items.push_back(entry);
        entries.pushed += 1;
    }

    /// Snapshot of the newest `count` entries, oldest first
    #[must_use]
    pub fn tail(&self, count: usize) -> Vec<LogEntry> {
        let entries = self.entries.lock();
        let skip = entries.items.len().saturating_sub(count);
        entries.items.iter().skip(skip).cloned().collect()
    }

    /// Returns a snapshot of all entries.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().items.iter().cloned().collect()
    }

    /// Number of entries ever pushed, including evicted ones
    #[must_use]
    pub fn pushed(&self) -> u64 {
        self.entries.lock().pushed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().items.is_empty()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(message: &str) -> LogEntry {
        LogEntry {
            level: Level::Info,
            target: "tooldeck".to_string(),
            message: message.to_string(),
            timestamp: Instant::now(),
        }
    }

    #[test]
    fn test_oldest_entries_are_evicted() {
        let buffer = LogBuffer::with_capacity(2);
        for message in ["one", "two", "three"] {
            buffer.push(entry(message));
        }
        let messages: Vec<_> = buffer.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, ["two", "three"]);
        assert_eq!(buffer.pushed(), 3);
    }

    #[test]
    fn test_tail() {
        let buffer = LogBuffer::new();
        for message in ["a", "b", "c"] {
            buffer.push(entry(message));
        }
        let tail: Vec<_> = buffer.tail(2).into_iter().map(|e| e.message).collect();
        assert_eq!(tail, ["b", "c"]);
        assert_eq!(buffer.tail(10).len(), 3);
    }
}
