use super::handlers::{self, CommandContext};
use super::types::{Command, CommandKind, DispatchMode};
use crate::audit::{AuditLog, Severity};
use crate::error::{AgentError, ErrorKind};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Maps each inbound command to its handler.
///
/// Commands are taken in arrival order. Inline commands finish before the
/// next one is taken; background commands are spawned and may complete in
/// any order, except ordered ones, which run one at a time in arrival order.
/// Handler errors and panics end up in the audit log.
pub struct CommandRouter {
    ctx: Arc<CommandContext>,
    /// Completion signal of the most recently queued ordered command.
    ordered_tail: Mutex<Option<oneshot::Receiver<()>>>,
}

impl CommandRouter {
    pub fn new(ctx: CommandContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            ordered_tail: Mutex::new(None),
        }
    }

    pub fn context(&self) -> &CommandContext {
        &self.ctx
    }

    /// Dispatch one command. Returns the worker handle for background
    /// commands; its output is already reported.
    pub async fn dispatch(&self, cmd: Command) -> Option<JoinHandle<()>> {
        let id = uuid::Uuid::new_v4();
        let kind = cmd.kind();
        let span = tracing::info_span!("command", %id, message_type = %cmd.message_type);
        self.ctx
            .audit
            .info(format!("Got Push Message, type {}", cmd.message_type));

        match kind.dispatch_mode() {
            DispatchMode::Inline => {
                let result = handlers::handle(&self.ctx, &kind, &cmd)
                    .instrument(span)
                    .await;
                report(&self.ctx.audit, &cmd.message_type, result);
                None
            }
            DispatchMode::Background => Some(self.spawn_worker(kind, cmd, span, None)),
            DispatchMode::Ordered => {
                let (done, turn) = oneshot::channel();
                let previous = self
                    .ordered_tail
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .replace(turn);
                Some(self.spawn_worker(kind, cmd, span, Some((previous, done))))
            }
        }
    }

    /// Spawn the handler and a watcher that reports its outcome. An ordered
    /// worker waits for its predecessor and signals `done` when it ends,
    /// panics included.
    fn spawn_worker(
        &self,
        kind: CommandKind,
        cmd: Command,
        span: tracing::Span,
        ordering: Option<(Option<oneshot::Receiver<()>>, oneshot::Sender<()>)>,
    ) -> JoinHandle<()> {
        let ctx = Arc::clone(&self.ctx);
        let message_type = cmd.message_type.clone();
        let worker = tokio::spawn(
            async move {
                let _done = match ordering {
                    Some((previous, done)) => {
                        if let Some(previous) = previous {
                            let _ = previous.await;
                        }
                        Some(done)
                    }
                    None => None,
                };
                handlers::handle(&ctx, &kind, &cmd).await
            }
            .instrument(span),
        );
        let audit = self.ctx.audit.clone();
        tokio::spawn(async move {
            match worker.await {
                Ok(result) => report(&audit, &message_type, result),
                Err(e) if e.is_panic() => {
                    audit.error(format!("Command {message_type} crashed"));
                }
                Err(_) => tracing::debug!(message_type, "command worker cancelled"),
            }
        })
    }

    /// Consume `rx` until it closes or `cancel` fires. Returns the number of
    /// commands dispatched.
    pub async fn run(&self, mut rx: mpsc::Receiver<Command>, cancel: CancellationToken) -> usize {
        let mut dispatched = 0usize;
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                cmd = rx.recv() => match cmd {
                    Some(cmd) => {
                        self.dispatch(cmd).await;
                        dispatched += 1;
                    }
                    None => break,
                },
            }
        }
        tracing::info!(dispatched, "command router stopped");
        dispatched
    }
}

fn severity_for(kind: ErrorKind) -> Severity {
    match kind {
        ErrorKind::Internal => Severity::Error,
        ErrorKind::PrivilegeInsufficient
        | ErrorKind::MalformedCommand
        | ErrorKind::CapabilityAbsent
        | ErrorKind::TransientIo
        | ErrorKind::ResourceAcquisition => Severity::Warn,
    }
}

fn report(audit: &AuditLog, message_type: &str, result: Result<(), AgentError>) {
    if let Err(e) = result {
        let kind = e.kind();
        tracing::warn!(message_type, ?kind, "command failed: {e}");
        audit.record(severity_for(kind), format!("Command {message_type} failed: {e}"));
    }
}
