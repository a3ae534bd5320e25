use crate::config::Config;
use crate::platform::daemon::{audit_outbox_path, state_file_path};

pub fn render_status(config: &Config) -> String {
    let mut lines = vec![
        "◆ kioskd".to_string(),
        String::new(),
        format!("Version     {}", env!("CARGO_PKG_VERSION")),
        format!("Config      {}", config.config_path.display()),
        format!("Device      {}", config.agent.device_id()),
        format!("Project     {}", config.agent.project),
        String::new(),
        format!("  Package        {}", config.agent.package),
        format!("  Boot storage   {}", config.storage.boot_dir().display()),
        format!("  Device config  {}", config.storage.device_config_path().display()),
        format!("  Containment    {:?}", config.containment.backend),
        format!("  Audit          {}", config.observability.audit_backend),
        format!(
            "  Uplink         {}",
            config.uplink.base_url.as_deref().unwrap_or("(log only)")
        ),
        String::new(),
    ];

    let path = state_file_path(config);
    match std::fs::read_to_string(&path) {
        Ok(raw) => {
            lines.push(format!("Last snapshot ({})", path.display()));
            match serde_json::from_str::<serde_json::Value>(&raw) {
                Ok(serde_json::Value::Object(map)) => {
                    for (key, value) in map {
                        lines.push(format!("  {key:<28} {value}"));
                    }
                }
                _ => lines.push("  (unreadable)".to_string()),
            }
        }
        Err(_) => lines.push("No status snapshot yet (agent not started)".to_string()),
    }

    let outbox = audit_outbox_path(config);
    if let Ok(raw) = std::fs::read_to_string(&outbox) {
        lines.push(format!(
            "Audit outbox: {} entries ({})",
            raw.lines().count(),
            outbox.display()
        ));
    }

    lines.join("\n")
}
