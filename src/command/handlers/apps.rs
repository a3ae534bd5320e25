use super::CommandContext;
use crate::command::payload::Payload;
use crate::command::types::Command;
use crate::device::{IntentFlags, LaunchIntent};
use crate::error::{AgentError, CommandError};

/// Browsers tried first for `open-url`, in order.
const PREFERRED_BROWSERS: &[&str] = &[
    "org.mozilla.firefox",
    "com.android.chrome",
    "com.brave.browser",
    "org.chromium.chrome",
    "com.opera.browser",
    "com.microsoft.emmx",
    "com.duckduckgo.mobile.android",
    "org.mozilla.focus",
    "com.sec.android.app.sbrowser",
];

/// Apps that claim web links but are not browsers.
const NON_BROWSER_MARKERS: &[&str] = &[
    "youtube",
    "facebook",
    "twitter",
    "instagram",
    "whatsapp",
    "telegram",
    "tiktok",
    "reddit",
];

pub(super) fn run_app(ctx: &CommandContext, cmd: &Command) -> Result<(), AgentError> {
    let fields = Payload::of(cmd).require_object()?;
    let package = fields.require_str("pkg")?;
    let Some(mut intent) = ctx.platform.packages.launch_intent_for(package) else {
        tracing::info!(package, "run-app: no launch target");
        return Ok(());
    };

    if let Some(action) = fields.str("action") {
        intent.action = Some(action.to_string());
    }
    if let Some(data) = fields.str("data") {
        match url::Url::parse(data) {
            Ok(uri) => intent.data = Some(uri.into()),
            Err(e) => tracing::debug!(data, "run-app: ignoring unparsable data: {e}"),
        }
    }
    if let Some(extra) = fields.object("extra") {
        intent.put_extras(extra);
    }
    intent.add_flags(IntentFlags::NEW_TASK | IntentFlags::RESET_TASK_IF_NEEDED);

    ctx.platform.launcher.start_activity(&intent)?;
    tracing::info!(package, "application started");
    Ok(())
}

pub(super) fn broadcast(ctx: &CommandContext, cmd: &Command) -> Result<(), AgentError> {
    let fields = Payload::of(cmd).require_object()?;
    let mut intent = LaunchIntent {
        package: fields.str("pkg").map(str::to_string),
        action: fields.str("action").map(str::to_string),
        data: fields.str("data").map(str::to_string),
        ..LaunchIntent::default()
    };
    if let Some(extra) = fields.object("extra") {
        let skipped = intent.put_extras(extra);
        if !skipped.is_empty() {
            tracing::debug!(?skipped, "broadcast: extras without a primitive type dropped");
        }
    }
    ctx.platform.launcher.send_broadcast(&intent)?;
    Ok(())
}

pub(super) async fn uninstall(ctx: &CommandContext, cmd: &Command) -> Result<(), AgentError> {
    let fields = Payload::of(cmd).require_object()?;
    let package = fields.require_str("pkg")?;
    if !ctx.caps.is_elevated() {
        return Err(AgentError::PrivilegeInsufficient(format!(
            "cannot uninstall {package}: no device owner"
        )));
    }
    ctx.platform.installer.uninstall(package).await?;
    ctx.audit.info(format!("Uninstalled application: {package}"));
    Ok(())
}

pub(super) fn intent(ctx: &CommandContext, cmd: &Command) -> Result<(), AgentError> {
    let fields = Payload::of(cmd).require_object()?;
    let mut intent = LaunchIntent::with_action(fields.require_str("action")?);
    intent.data = fields.str("data").map(str::to_string);
    if let Some(category) = fields.str("category") {
        intent.categories.push(category.to_string());
    }
    if let Some(extra) = fields.object("extra") {
        intent.put_extras(extra);
    }
    intent.add_flags(IntentFlags::CLEAR_TASK | IntentFlags::NEW_TASK);
    ctx.platform.launcher.start_activity(&intent)?;
    Ok(())
}

pub(super) fn open_url(ctx: &CommandContext, cmd: &Command) -> Result<(), AgentError> {
    let raw = Payload::of(cmd).require_text()?;
    let url = url::Url::parse(raw.trim()).map_err(|e| CommandError::InvalidField {
        command: cmd.message_type.clone(),
        field: "payload".into(),
        message: format!("`{raw}` is not a URL: {e}"),
    })?;

    let mut intent = LaunchIntent::view(url.as_str());
    intent.add_flags(IntentFlags::NEW_TASK);
    let handlers = ctx.platform.packages.handlers_for(&intent);
    intent.package = pick_browser(&handlers, |p| ctx.platform.packages.is_installed(p));

    ctx.platform.launcher.start_activity(&intent).map_err(|e| {
        AgentError::Other(anyhow::anyhow!("Failed to open URL: {url} - {e}"))
    })?;
    tracing::info!(%url, browser = ?intent.package, "url opened");
    Ok(())
}

/// Known browser if installed, else the first handler that is not a known
/// non-browser, else `None` for the platform default.
fn pick_browser(handlers: &[String], is_installed: impl Fn(&str) -> bool) -> Option<String> {
    if let Some(browser) = PREFERRED_BROWSERS.iter().find(|b| is_installed(b)) {
        return Some((*browser).to_string());
    }
    handlers
        .iter()
        .find(|h| {
            let lower = h.to_ascii_lowercase();
            !NON_BROWSER_MARKERS.iter().any(|m| lower.contains(m))
        })
        .cloned()
}

pub(super) fn grant_permissions(ctx: &CommandContext, cmd: &Command) -> Result<(), AgentError> {
    if !ctx.caps.is_elevated() {
        ctx.audit
            .warn("Can't auto grant permissions: no device owner");
    }

    let config = ctx.config.current();
    let payload = Payload::of(cmd);
    let packages: Vec<String> = if payload.is_empty() {
        config
            .as_deref()
            .map(|c| {
                c.applications()
                    .iter()
                    .filter(|app| app.is_installable_app())
                    .filter_map(|app| app.package())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    } else {
        payload.require_object()?.str_list("pkg")
    };
    let policy = config
        .as_deref()
        .map(|c| c.app_permissions())
        .unwrap_or_default();

    let mut failed = 0usize;
    for package in &packages {
        if let Err(e) = ctx
            .platform
            .policy
            .grant_requested_permissions(package, policy)
        {
            failed += 1;
            tracing::warn!(package = %package, "permission grant failed: {e}");
        }
    }
    tracing::info!(total = packages.len(), failed, %policy, "permissions granted");
    if failed > 0 {
        ctx.audit.warn(format!(
            "Permission grant failed for {failed} of {} applications",
            packages.len()
        ));
    }
    Ok(())
}

pub(super) fn clear_app_data(ctx: &CommandContext, cmd: &Command) -> Result<(), AgentError> {
    let fields = Payload::of(cmd).require_object()?;
    let package = fields.require_str("pkg")?;
    ctx.audit.info(format!("Clearing app data for {package}"));
    if !ctx.caps.supports_clear_app_data() {
        return Err(AgentError::CapabilityAbsent(format!(
            "clearing app data is unsupported in SDK {}",
            ctx.caps.sdk_level
        )));
    }
    ctx.platform.policy.clear_app_data(package)?;
    Ok(())
}
