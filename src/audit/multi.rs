use super::traits::{AuditEntry, AuditSink};
use std::sync::Arc;

/// Fan-out sink: forwards every entry to each inner sink.
pub struct MultiSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl MultiSink {
    pub fn new(sinks: Vec<Arc<dyn AuditSink>>) -> Self {
        Self { sinks }
    }
}

impl AuditSink for MultiSink {
    fn record(&self, entry: &AuditEntry) {
        for sink in &self.sinks {
            sink.record(entry);
        }
    }

    fn flush(&self) {
        for sink in &self.sinks {
            sink.flush();
        }
    }

    fn name(&self) -> &str {
        "multi"
    }
}
