//! One handler per command kind. Handlers report through the audit log and
//! return errors to the router; nothing reaches the command transport.

mod apps;
mod files;
mod presence;
mod system;

use super::types::{Command, CommandKind};
use crate::audit::AuditLog;
use crate::config::ConfigHandle;
use crate::containment::PermissiveMode;
use crate::device::{Capabilities, ConfigProvider, Platform};
use crate::emergency::EmergencyController;
use crate::error::AgentError;
use crate::events::EventBus;
use crate::lock::LockStateMachine;
use std::sync::Arc;

/// Everything a handler may touch.
#[derive(Clone)]
pub struct CommandContext {
    pub settings: ConfigHandle,
    pub config: Arc<dyn ConfigProvider>,
    pub platform: Platform,
    pub caps: Capabilities,
    pub lock: Arc<LockStateMachine>,
    pub emergency: Arc<EmergencyController>,
    pub permissive: Arc<PermissiveMode>,
    pub events: EventBus,
    pub audit: AuditLog,
}

pub(super) async fn handle(
    ctx: &CommandContext,
    kind: &CommandKind,
    cmd: &Command,
) -> Result<(), AgentError> {
    match kind {
        CommandKind::ConfigUpdated => presence::config_updated(ctx),
        CommandKind::PermissiveMode => presence::permissive_mode(ctx),
        CommandKind::EnterKiosk => presence::enter_kiosk(ctx),
        CommandKind::ExitKiosk => presence::exit_kiosk(ctx),
        CommandKind::AdminPanel => presence::admin_panel(ctx),
        CommandKind::Lock => presence::lock(ctx),
        CommandKind::Unlock => presence::unlock(ctx),
        CommandKind::Attention => presence::attention(ctx),
        CommandKind::Message => presence::message(ctx, cmd),
        CommandKind::PingLocation => presence::ping_location(ctx).await,
        CommandKind::EmergencyMode => presence::emergency_mode(ctx, cmd),
        CommandKind::RunApp => apps::run_app(ctx, cmd),
        CommandKind::Broadcast => apps::broadcast(ctx, cmd),
        CommandKind::UninstallApp => apps::uninstall(ctx, cmd).await,
        CommandKind::Intent => apps::intent(ctx, cmd),
        CommandKind::OpenUrl => apps::open_url(ctx, cmd),
        CommandKind::GrantPermissions => apps::grant_permissions(ctx, cmd),
        CommandKind::ClearAppData => apps::clear_app_data(ctx, cmd),
        CommandKind::DeleteFile => files::delete_file(ctx, cmd).await,
        CommandKind::DeleteDir => files::delete_dir(ctx, cmd).await,
        CommandKind::PurgeDir => files::purge_dir(ctx, cmd).await,
        CommandKind::ClearDownloads => files::clear_downloads(ctx).await,
        CommandKind::RunCommand => system::run_command(ctx, cmd).await,
        CommandKind::Reboot => system::reboot(ctx),
        CommandKind::SetVolume => system::set_volume(ctx, cmd).await,
        CommandKind::SetBrightness => system::set_brightness(ctx, cmd).await,
        CommandKind::Other(_) => presence::forward_extension(ctx, cmd),
    }
}
