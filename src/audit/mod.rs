//! Audit logging: the device-side half of the remote audit log.
//!
//! Every failure and notable action ends up here as `(severity, message)`.
//! Nothing in the engine propagates errors back to the command transport;
//! this log is the only place they surface.

mod buffer;
mod log;
mod multi;
mod noop;
mod traits;

pub use buffer::BufferedSink;
pub use log::LogSink;
pub use multi::MultiSink;
pub use noop::NoopSink;
pub use traits::{AuditEntry, AuditSink, Severity};

use crate::config::ObservabilityConfig;
use std::sync::Arc;

/// Cloneable handle used by every component to write audit entries.
#[derive(Clone)]
pub struct AuditLog {
    sink: Arc<dyn AuditSink>,
    buffer: Option<Arc<BufferedSink>>,
}

impl AuditLog {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink, buffer: None }
    }

    /// Audit log that only queues entries in memory. Handy for inspection.
    pub fn buffered(capacity: usize) -> Self {
        let buffer = Arc::new(BufferedSink::new(capacity));
        Self {
            sink: buffer.clone(),
            buffer: Some(buffer),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(NoopSink))
    }

    pub fn record(&self, severity: Severity, message: impl Into<String>) {
        self.sink.record(&AuditEntry::now(severity, message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.record(Severity::Error, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.record(Severity::Warn, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.record(Severity::Info, message);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.record(Severity::Debug, message);
    }

    pub fn flush(&self) {
        self.sink.flush();
    }

    /// Queue of entries not yet moved to the outbox, when the backend buffers.
    pub fn buffer(&self) -> Option<&Arc<BufferedSink>> {
        self.buffer.as_ref()
    }

    pub fn backend_name(&self) -> &str {
        self.sink.name()
    }
}

/// Factory: build the audit log from `[observability]`.
pub fn create_audit_log(config: &ObservabilityConfig) -> AuditLog {
    match config.audit_backend.as_str() {
        "log" => AuditLog::new(Arc::new(LogSink::new())),
        "buffer" => {
            let buffer = Arc::new(BufferedSink::new(config.audit_buffer));
            let multi = MultiSink::new(vec![Arc::new(LogSink::new()), buffer.clone()]);
            AuditLog {
                sink: Arc::new(multi),
                buffer: Some(buffer),
            }
        }
        "none" | "noop" => AuditLog::disabled(),
        other => {
            tracing::warn!("Unknown audit backend '{other}', falling back to log");
            AuditLog::new(Arc::new(LogSink::new()))
        }
    }
}
