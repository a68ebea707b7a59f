//! Live diagnostic log stream
//!
//! Every pipeline step reports progress as a [`LogEntry`]. Entries go to
//! `tracing`, to all subscribers of the [`LogBus`] (the browser console via
//! WebSocket), and to the per-request list returned in the upload response.
//!
//! Publishing is best-effort: a bus with no subscribers drops entries.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Channel capacity for log updates
const CHANNEL_CAPACITY: usize = 256;

/// Severity shown in the browser console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Progress
    Info,
    /// A step produced its result
    Success,
    /// Recoverable problem
    Warn,
    /// A provider or pipeline step failed
    Error,
    /// Intermediate detail such as raw transcripts
    Debug,
}

/// One console line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Message text
    pub msg: String,
    /// Severity, serialized as `type`
    #[serde(rename = "type")]
    pub level: LogLevel,
}

/// Broadcast hub for log entries
#[derive(Debug, Clone)]
pub struct LogBus {
    tx: broadcast::Sender<LogEntry>,
}

impl Default for LogBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LogBus {
    /// Create a bus with no subscribers
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to log updates
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.tx.subscribe()
    }

    /// Publish an entry to current subscribers
    pub fn publish(&self, entry: LogEntry) {
        // no subscribers is fine
        let _ = self.tx.send(entry);
    }

    /// Start collecting entries for one request
    #[must_use]
    pub fn request(&self) -> RequestLog {
        RequestLog {
            bus: self.clone(),
            entries: Vec::new(),
        }
    }
}

/// Ordered log of one request, mirrored to the bus and `tracing`
#[derive(Debug)]
pub struct RequestLog {
    bus: LogBus,
    entries: Vec<LogEntry>,
}

impl RequestLog {
    /// Record an entry
    pub fn push(&mut self, level: LogLevel, msg: impl Into<String>) {
        let msg = msg.into();

        match level {
            LogLevel::Info | LogLevel::Success => tracing::info!(kind = ?level, "{msg}"),
            LogLevel::Warn => tracing::warn!("{msg}"),
            LogLevel::Error => tracing::error!("{msg}"),
            LogLevel::Debug => tracing::debug!("{msg}"),
        }

        let entry = LogEntry { msg, level };
        self.bus.publish(entry.clone());
        self.entries.push(entry);
    }

    /// Record an info entry
    pub fn info(&mut self, msg: impl Into<String>) {
        self.push(LogLevel::Info, msg);
    }

    /// Record a success entry
    pub fn success(&mut self, msg: impl Into<String>) {
        self.push(LogLevel::Success, msg);
    }

    /// Record a warning
    pub fn warn(&mut self, msg: impl Into<String>) {
        self.push(LogLevel::Warn, msg);
    }

    /// Record an error
    pub fn error(&mut self, msg: impl Into<String>) {
        self.push(LogLevel::Error, msg);
    }

    /// Record a debug entry
    pub fn debug(&mut self, msg: impl Into<String>) {
        self.push(LogLevel::Debug, msg);
    }

    /// Entries recorded so far
    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Consume the log, returning its entries
    #[must_use]
    pub fn into_entries(self) -> Vec<LogEntry> {
        self.entries
    }
}
