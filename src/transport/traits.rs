use crate::command::Command;
use async_trait::async_trait;

/// Delivers remote commands to the agent.
#[async_trait]
pub trait CommandSource: Send + Sync {
    /// Human-readable source name
    fn name(&self) -> &str;

    /// Push every received command into `tx` until the source is exhausted
    /// or the receiver goes away (long-running).
    async fn listen(&self, tx: tokio::sync::mpsc::Sender<Command>) -> anyhow::Result<()>;

    /// Check if the source is healthy
    async fn health_check(&self) -> bool {
        true
    }
}
