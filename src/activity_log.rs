use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::RwLock;

use crate::models::{LogEntry, Severity};

pub const DEFAULT_LOG_CAPACITY: usize = 500;

// Newest-first activity log. Holds at most `capacity` entries; the oldest
// are dropped first.
pub struct ActivityLog {
    entries: RwLock<VecDeque<LogEntry>>,
    capacity: usize,
    next_id: AtomicU64,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity.min(64))),
            capacity,
            next_id: AtomicU64::new(1),
        }
    }

    pub async fn append(&self, message: impl Into<String>, severity: Severity) -> LogEntry {
        let entry = LogEntry {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            timestamp: Utc::now(),
            message: message.into(),
            severity,
        };

        match severity {
            Severity::Info | Severity::Success => tracing::info!("{}", entry.message),
            Severity::Error => tracing::error!("{}", entry.message),
        }

        let mut entries = self.entries.write().await;
        entries.push_front(entry.clone());
        entries.truncate(self.capacity);
        entry
    }

    pub async fn info(&self, message: impl Into<String>) -> LogEntry {
        self.append(message, Severity::Info).await
    }

    pub async fn success(&self, message: impl Into<String>) -> LogEntry {
        self.append(message, Severity::Success).await
    }

    pub async fn error(&self, message: impl Into<String>) -> LogEntry {
        self.append(message, Severity::Error).await
    }

    pub async fn entries(&self) -> Vec<LogEntry> {
        self.entries.read().await.iter().cloned().collect()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}
