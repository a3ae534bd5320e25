use super::traits::{AuditEntry, AuditSink, Severity};
use tracing::{debug, error, info, warn};

/// Audit sink that only writes to `tracing`.
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for LogSink {
    fn record(&self, entry: &AuditEntry) {
        let message = entry.message.as_str();
        match entry.severity {
            Severity::Error => error!(target: "audit", ts = entry.timestamp_ms, "{message}"),
            Severity::Warn => warn!(target: "audit", ts = entry.timestamp_ms, "{message}"),
            Severity::Info => info!(target: "audit", ts = entry.timestamp_ms, "{message}"),
            Severity::Debug => debug!(target: "audit", ts = entry.timestamp_ms, "{message}"),
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}
