//! Bounded, newest-first log of notable events

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// Maximum number of retained entries
pub const MAX_LOG_SIZE: usize = 50;

/// A single log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub time: DateTime<Local>,
    pub message: String,
}

/// Append-only event log shown to dashboard users
#[derive(Debug)]
pub struct EventLog {
    entries: RwLock<VecDeque<LogEntry>>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_LOG_SIZE)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity + 1)),
            capacity,
        }
    }

    /// Append a message stamped with the current time
    pub async fn add(&self, message: impl Into<String>) {
        self.add_at(message, Local::now()).await;
    }

    /// Append a message with an explicit timestamp
    pub async fn add_at(&self, message: impl Into<String>, time: DateTime<Local>) {
        let message = message.into();
        tracing::info!(target: "event_log", "{}", message);

        let mut entries = self.entries.write().await;
        entries.push_front(LogEntry { time, message });
        entries.truncate(self.capacity);
    }

    /// All retained entries, newest first
    pub async fn snapshot(&self) -> Vec<LogEntry> {
        self.entries.read().await.iter().cloned().collect()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
