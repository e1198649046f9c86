//! # Per-task bounded log.
//!
//! [`LogBuffer`] is a fixed-capacity ring: once `capacity` entries are stored, the next
//! append first drops the oldest entries so that only the most recent `retain` remain.
//!
//! ```text
//! capacity = 1000, retain = 500
//!
//!   [e1 .. e1000] + push(e1001) ──► [e501 .. e1000, e1001]
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Default buffer capacity.
pub const DEFAULT_LOG_CAPACITY: usize = 1000;
/// Default number of entries kept after an overflow.
pub const DEFAULT_LOG_RETAIN: usize = 500;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        })
    }
}

/// One timestamped line in a task log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: SystemTime,
    pub level: LogLevel,
    pub message: String,
}

/// Bounded append-only log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    retain: usize,
}

impl LogBuffer {
    /// Creates an empty buffer.
    ///
    /// `capacity` is clamped to at least 1 and `retain` to `[0, capacity - 1]`, so an
    /// overflow always frees room for the new entry.
    pub fn new(capacity: usize, retain: usize) -> Self {
        let capacity = capacity.max(1);
        let retain = retain.min(capacity - 1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(64)),
            capacity,
            retain,
        }
    }

    /// Appends an entry, trimming to the most recent `retain` entries on overflow.
    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() >= self.capacity {
            let excess = self.entries.len() - self.retain;
            self.entries.drain(..excess);
        }
        self.entries.push_back(entry);
    }

    /// Shorthand for pushing a new entry.
    pub fn record(&mut self, at: SystemTime, level: LogLevel, message: impl Into<String>) {
        self.push(LogEntry {
            at,
            level,
            message: message.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Most recent entry, if any.
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY, DEFAULT_LOG_RETAIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(buf: &mut LogBuffer, n: usize) {
        for i in 0..n {
            buf.record(SystemTime::UNIX_EPOCH, LogLevel::Info, format!("line {i}"));
        }
    }

    #[test]
    fn test_below_capacity_keeps_everything() {
        let mut buf = LogBuffer::default();
        fill(&mut buf, 1000);
        assert_eq!(buf.len(), 1000);
        assert_eq!(buf.iter().next().map(|e| e.message.as_str()), Some("line 0"));
    }

    #[test]
    fn test_overflow_trims_to_most_recent() {
        let mut buf = LogBuffer::default();
        fill(&mut buf, 1001);
        assert_eq!(buf.len(), 501);
        assert_eq!(
            buf.iter().next().map(|e| e.message.as_str()),
            Some("line 500")
        );
        assert_eq!(buf.last().map(|e| e.message.as_str()), Some("line 1000"));
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut buf = LogBuffer::new(10, 4);
        for i in 0..100 {
            buf.record(SystemTime::UNIX_EPOCH, LogLevel::Debug, i.to_string());
            assert!(buf.len() <= 10, "len {} after {} pushes", buf.len(), i + 1);
        }
        assert_eq!(buf.last().map(|e| e.message.as_str()), Some("99"));
    }

    #[test]
    fn test_degenerate_sizes_are_clamped() {
        let mut buf = LogBuffer::new(0, 10);
        assert_eq!(buf.capacity(), 1);
        fill(&mut buf, 3);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.last().map(|e| e.message.as_str()), Some("line 2"));
    }
}
