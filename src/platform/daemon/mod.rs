//! Long-running agent: engine, command ingress, status writer, signals.

mod state;
mod supervisor;

pub use state::{AUDIT_OUTBOX_FILE, STATE_FILE, audit_outbox_path, state_file_path};

use crate::audit::create_audit_log;
use crate::command::Command;
use crate::config::{ConfigHandle, ShellMode};
use crate::device::ShellRunner;
use crate::engine::DeviceEngine;
use crate::events::AgentEvent;
use crate::platform::host::HostDevice;
use crate::platform::shell::SystemShell;
use crate::transport::CommandSource;
use crate::uplink::create_uplink;
use anyhow::Result;
use std::sync::Arc;
use supervisor::{RestartPolicy, spawn_component_supervisor};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const STATUS_FLUSH_SECONDS: u64 = 5;
const COMMAND_QUEUE: usize = 64;
const INITIAL_BACKOFF_SECS: u64 = 1;
const MAX_BACKOFF_SECS: u64 = 60;
const MAX_RESTARTS: u32 = 10;

/// Build the headless platform from `[host]`, start the engine and serve
/// commands from `source` until Ctrl-C.
pub async fn run(settings: ConfigHandle, source: Arc<dyn CommandSource>) -> Result<()> {
    let config = settings.load_full();
    let audit = create_audit_log(&config.observability);
    let uplink = create_uplink(&config.uplink)?;
    let device = Arc::new(HostDevice::from_config(&config.host));
    let shell: Arc<dyn ShellRunner> = match config.host.shell {
        ShellMode::System => Arc::new(SystemShell::default()),
        ShellMode::Simulate => device.clone(),
    };
    let platform = device.platform(shell, uplink);

    let engine = Arc::new(DeviceEngine::start(settings.clone(), platform, audit));
    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel::<Command>(COMMAND_QUEUE);

    let mut handles: Vec<JoinHandle<()>> = vec![state::spawn_state_writer(
        Arc::clone(&config),
        Arc::clone(&engine),
    )];
    handles.push(spawn_component_supervisor(
        "commands",
        RestartPolicy::OnFailure,
        INITIAL_BACKOFF_SECS,
        MAX_BACKOFF_SECS,
        MAX_RESTARTS,
        move || {
            let source = Arc::clone(&source);
            let tx = tx.clone();
            async move { source.listen(tx).await }
        },
    ));
    let router_engine = Arc::clone(&engine);
    let router_cancel = cancel.clone();
    handles.push(tokio::spawn(async move {
        router_engine.router().run(rx, router_cancel).await;
    }));
    #[cfg(unix)]
    handles.push(spawn_reload_on_hangup(settings, Arc::clone(&engine)));

    tracing::info!(
        device_id = %config.agent.device_id(),
        audit = engine.audit().backend_name(),
        "kioskd started, Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");

    cancel.cancel();
    engine.stop();
    for handle in &handles {
        handle.abort();
    }
    for handle in handles {
        let _ = handle.await;
    }
    state::write_snapshot(&state_file_path(&config), &engine).await;
    state::flush_audit_outbox(&audit_outbox_path(&config), engine.audit()).await;

    Ok(())
}

/// SIGHUP reloads `config.toml` and re-reads the device configuration.
#[cfg(unix)]
fn spawn_reload_on_hangup(settings: ConfigHandle, engine: Arc<DeviceEngine>) -> JoinHandle<()> {
    use tokio::signal::unix::{SignalKind, signal};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(stream) => stream,
            Err(error) => {
                tracing::warn!(%error, "cannot listen for SIGHUP");
                return;
            }
        };
        while hangup.recv().await.is_some() {
            if let Err(error) = settings.reload() {
                tracing::warn!(%error, "config reload failed");
            }
            engine.events().publish(AgentEvent::ConfigUpdated);
        }
    })
}
