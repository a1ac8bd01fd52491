//! User-facing logging surface
//!
//! Reconciliation reports truncations and swallowed failures to whatever the
//! host shows the user (a plugin panel, the geoprocessing messages window,
//! a terminal). Hosts implement [`LogSink`]; library internals additionally
//! emit `tracing` events for developers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

/// Severity of a user-facing message. Higher is more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum LogLevel {
    Info = 0,
    Warning = 1,
    Error = 2,
}

impl LogLevel {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warning => write!(f, "warning"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Sink for messages shown to the user
pub trait LogSink: Send + Sync {
    /// Record `message` at `level`; `origin` names the operation that produced it
    fn log(&self, message: &str, level: LogLevel, origin: &str);
}

/// Forwards user-facing messages to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, message: &str, level: LogLevel, origin: &str) {
        match level {
            LogLevel::Info => tracing::info!(origin = origin, "{}", message),
            LogLevel::Warning => tracing::warn!(origin = origin, "{}", message),
            LogLevel::Error => tracing::error!(origin = origin, "{}", message),
        }
    }
}

/// A recorded message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub origin: String,
    pub message: String,
}

/// Collects messages in memory so they can be inspected or replayed later
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Entries at `level` or above
    pub fn at_least(&self, level: LogLevel) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.level >= level)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl LogSink for MemorySink {
    fn log(&self, message: &str, level: LogLevel, origin: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                level,
                origin: origin.to_string(),
                message: message.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering_and_values() {
        assert!(LogLevel::Error > LogLevel::Warning);
        assert_eq!(LogLevel::Warning.as_i32(), 1);
        assert_eq!(LogLevel::Error.as_i32(), 2);
    }

    #[test]
    fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        sink.log("first", LogLevel::Info, "test");
        sink.log("second", LogLevel::Error, "test");

        assert_eq!(sink.len(), 2);
        let severe = sink.at_least(LogLevel::Warning);
        assert_eq!(severe.len(), 1);
        assert_eq!(severe[0].message, "second");

        sink.clear();
        assert!(sink.is_empty());
    }
}
