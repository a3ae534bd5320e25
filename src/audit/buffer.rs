use super::traits::{AuditEntry, AuditSink};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Bounded in-memory queue of audit entries waiting to be shipped. The
/// daemon's status writer drains it into the audit outbox file.
///
/// When full, the oldest entry is evicted.
pub struct BufferedSink {
    capacity: usize,
    entries: Mutex<VecDeque<AuditEntry>>,
}

impl BufferedSink {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    /// Take every queued entry, oldest first.
    pub fn drain(&self) -> Vec<AuditEntry> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.drain(..).collect()
    }

    /// Copy of the queued entries, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for BufferedSink {
    fn record(&self, entry: &AuditEntry) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry.clone());
    }

    fn name(&self) -> &str {
        "buffer"
    }
}
