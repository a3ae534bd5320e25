use super::CommandContext;
use crate::command::payload::Payload;
use crate::command::types::Command;
use crate::error::{AgentError, CommandError};

const MAX_VOLUME_LEVEL: i64 = 15;
const MAX_BRIGHTNESS: i64 = 255;
/// Output kept in the audit entry of `run-command`.
const COMMAND_OUTPUT_LIMIT: usize = 200;

pub(super) async fn run_command(ctx: &CommandContext, cmd: &Command) -> Result<(), AgentError> {
    let fields = Payload::of(cmd).require_object()?;
    let command = fields.require_str("command")?;
    let output = ctx.platform.shell.run(command).await?;
    ctx.audit.debug(format!(
        "Executed a command: {command} Result: {}",
        truncate(&output, COMMAND_OUTPUT_LIMIT)
    ));
    Ok(())
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

pub(super) fn reboot(ctx: &CommandContext) -> Result<(), AgentError> {
    ctx.audit.warn("Rebooting by a Push message");
    if !ctx.caps.is_elevated() {
        return Err(AgentError::PrivilegeInsufficient(
            "reboot needs device owner".into(),
        ));
    }
    ctx.platform.policy.reboot()?;
    Ok(())
}

/// Volume 0..=15 mapped to a percentage. A policy lock is lifted for the
/// change and put back afterwards; the shell is the fallback.
pub(super) async fn set_volume(ctx: &CommandContext, cmd: &Command) -> Result<(), AgentError> {
    let level = Payload::of(cmd)
        .require_int()
        .map_err(|_| invalid(cmd, "Invalid volume value"))?
        .clamp(0, MAX_VOLUME_LEVEL);
    let percent = u8::try_from(level * 100 / MAX_VOLUME_LEVEL).unwrap_or(100);

    let policy = &ctx.platform.policy;
    let config_locked = ctx.config.current().is_some_and(|c| c.lock_volume());
    let relock = config_locked || policy.is_volume_locked();
    if relock && let Err(e) = policy.set_volume_locked(false) {
        tracing::warn!("failed to unlock volume: {e}");
    }
    let applied = ctx.platform.audio.set_volume_percent(percent);
    if relock && let Err(e) = policy.set_volume_locked(true) {
        tracing::warn!("failed to re-lock volume: {e}");
    }

    match applied {
        Ok(()) => {
            ctx.audit.debug(format!("Set volume to {percent}%"));
            Ok(())
        }
        Err(e) => {
            tracing::info!("volume control failed ({e}), trying shell");
            let output = ctx
                .platform
                .shell
                .run(&format!("media volume --stream 3 --set {level}"))
                .await?;
            ctx.audit.debug(format!("Set volume via shell: {output}"));
            Ok(())
        }
    }
}

/// Brightness 0..=255 through the policy path, falling back to settings
/// writes with auto-brightness turned off first.
pub(super) async fn set_brightness(ctx: &CommandContext, cmd: &Command) -> Result<(), AgentError> {
    let level = Payload::of(cmd)
        .require_int()
        .map_err(|_| invalid(cmd, "Invalid brightness value"))?
        .clamp(0, MAX_BRIGHTNESS);
    let level = u8::try_from(level).unwrap_or(u8::MAX);

    match ctx.platform.policy.set_brightness(level) {
        Ok(()) => {
            ctx.audit.debug(format!("Set brightness to {level}"));
            Ok(())
        }
        Err(e) => {
            tracing::info!("brightness policy failed ({e}), trying shell");
            let shell = &ctx.platform.shell;
            shell.run("settings put system screen_brightness_mode 0").await?;
            shell
                .run(&format!("settings put system screen_brightness {level}"))
                .await?;
            ctx.audit.debug(format!("Set brightness via shell to {level}"));
            Ok(())
        }
    }
}

fn invalid(cmd: &Command, message: &str) -> CommandError {
    CommandError::InvalidField {
        command: cmd.message_type.clone(),
        field: "payload".into(),
        message: format!(
            "{message}: {}",
            cmd.payload.as_ref().map(ToString::to_string).unwrap_or_default()
        ),
    }
}
