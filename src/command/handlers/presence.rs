use super::CommandContext;
use crate::command::payload::Payload;
use crate::command::types::Command;
use crate::device::LaunchIntent;
use crate::device::intent::ExtraValue;
use crate::emergency::EmergencyDirective;
use crate::error::AgentError;
use crate::events::AgentEvent;
use crate::lock::UnlockTrigger;
use std::time::Duration;

/// Action prefix of broadcasts forwarded to extension modules.
pub const EXTENSION_ACTION_PREFIX: &str = "com.hmdm.push.";
/// Extra holding the raw JSON payload on extension broadcasts.
pub const EXTENSION_PAYLOAD_EXTRA: &str = "com.hmdm.PUSH_DATA";

/// Screen is held on this long by `unlock`; the keyguard stays off as long.
const UNLOCK_WAKE: Duration = Duration::from_secs(5);

pub(super) fn config_updated(ctx: &CommandContext) -> Result<(), AgentError> {
    ctx.events.publish(AgentEvent::ConfigUpdated);
    Ok(())
}

pub(super) fn permissive_mode(ctx: &CommandContext) -> Result<(), AgentError> {
    let grant = Duration::from_millis(ctx.settings.load().containment.permissive_grant_ms);
    ctx.permissive
        .grant_for(grant, chrono::Utc::now().timestamp_millis());
    ctx.events.publish(AgentEvent::PermissiveMode);
    tracing::info!(grant_ms = %grant.as_millis(), "permissive mode granted");
    Ok(())
}

pub(super) fn enter_kiosk(ctx: &CommandContext) -> Result<(), AgentError> {
    ctx.events.publish(AgentEvent::EnterKiosk);
    Ok(())
}

pub(super) fn exit_kiosk(ctx: &CommandContext) -> Result<(), AgentError> {
    ctx.events.publish(AgentEvent::ExitKiosk);
    Ok(())
}

pub(super) fn admin_panel(ctx: &CommandContext) -> Result<(), AgentError> {
    ctx.events.publish(AgentEvent::AdminPanel);
    Ok(())
}

pub(super) fn lock(ctx: &CommandContext) -> Result<(), AgentError> {
    ctx.lock.lock();
    ctx.audit.info("Lock screen displayed");
    Ok(())
}

pub(super) fn unlock(ctx: &CommandContext) -> Result<(), AgentError> {
    let policy = ctx.platform.policy.clone();
    if let Err(e) = policy.wake_screen(UNLOCK_WAKE) {
        tracing::warn!("failed to wake screen: {e}");
    }
    if ctx.caps.supports_keyguard_control() {
        match policy.set_keyguard_disabled(true) {
            Ok(()) => {
                tokio::spawn(async move {
                    tokio::time::sleep(UNLOCK_WAKE).await;
                    if let Err(e) = policy.set_keyguard_disabled(false) {
                        tracing::warn!("failed to re-enable keyguard: {e}");
                    }
                });
            }
            Err(e) => tracing::warn!("failed to disable keyguard: {e}"),
        }
    }
    ctx.lock.unlock(UnlockTrigger::Command);
    ctx.audit.info("Device unlocked and kiosk mode exited");
    Ok(())
}

pub(super) fn attention(ctx: &CommandContext) -> Result<(), AgentError> {
    let timeout = Duration::from_millis(ctx.settings.load().presentation.attention_timeout_ms);
    ctx.platform.presenter.show_attention(timeout)?;
    ctx.audit.info("Attention signal sent");
    Ok(())
}

pub(super) fn message(ctx: &CommandContext, cmd: &Command) -> Result<(), AgentError> {
    let text = Payload::of(cmd).require_text()?;
    let timeout = Duration::from_millis(ctx.settings.load().presentation.message_timeout_ms);
    ctx.platform.presenter.show_message(&text, timeout)?;
    ctx.audit.info(format!("Message displayed: {text}"));
    Ok(())
}

pub(super) async fn ping_location(ctx: &CommandContext) -> Result<(), AgentError> {
    ctx.emergency.ping_once().await
}

pub(super) fn emergency_mode(ctx: &CommandContext, cmd: &Command) -> Result<(), AgentError> {
    let directive = EmergencyDirective::parse(&Payload::of(cmd).require_text()?)?;
    ctx.emergency.apply(directive);
    Ok(())
}

/// Unknown type: publish on the bus and broadcast to extension modules.
pub(super) fn forward_extension(ctx: &CommandContext, cmd: &Command) -> Result<(), AgentError> {
    ctx.events.publish(AgentEvent::Extension {
        message_type: cmd.message_type.clone(),
        payload: cmd.payload.clone(),
    });

    let mut intent = LaunchIntent::with_action(format!("{EXTENSION_ACTION_PREFIX}{}", cmd.message_type));
    if let Some(payload) = Payload::of(cmd).object() {
        intent.extras.insert(
            EXTENSION_PAYLOAD_EXTRA.into(),
            ExtraValue::Str(serde_json::Value::Object(payload).to_string()),
        );
    }
    ctx.platform.launcher.send_broadcast(&intent)?;
    Ok(())
}
