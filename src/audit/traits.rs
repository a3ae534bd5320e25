use serde::Serialize;
use strum::Display;

/// Audit severity, ordered from most to least urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Error,
    Warn,
    Info,
    Debug,
}

/// One entry destined for the remote audit log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub severity: Severity,
    pub message: String,
    pub timestamp_ms: i64,
}

impl AuditEntry {
    pub fn now(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Destination for audit entries. Implementations must not block.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);

    /// Flush any buffered data (no-op for most backends)
    fn flush(&self) {}

    fn name(&self) -> &str;
}
