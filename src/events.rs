//! Typed in-process event bus.
//!
//! Replaces the local broadcast side-channel: the router publishes, the
//! containment service, kiosk session and configuration refresher subscribe.

use serde_json::Value;
use tokio::sync::broadcast;

/// Default buffer for the bus; slow subscribers see `Lagged` past this.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// Device configuration changed on the server.
    ConfigUpdated,
    /// A timed permissive grant was just set.
    PermissiveMode,
    EnterKiosk,
    ExitKiosk,
    AdminPanel,
    /// Lock state changed.
    LockChanged { locked: bool },
    /// Unrecognized command type, forwarded for extension modules.
    Extension {
        message_type: String,
        payload: Option<Value>,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AgentEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to every current subscriber. Returns how many received it.
    pub fn publish(&self, event: AgentEvent) -> usize {
        tracing::debug!(?event, "event.publish");
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
