use super::Config;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(device_id) = std::env::var("KIOSKD_DEVICE_ID")
            && !device_id.is_empty()
        {
            self.agent.device_id = Some(device_id);
        }

        if let Ok(project) = std::env::var("KIOSKD_PROJECT")
            && !project.is_empty()
        {
            self.agent.project = project;
        }

        if let Ok(boot_dir) = std::env::var("KIOSKD_BOOT_DIR")
            && !boot_dir.is_empty()
        {
            self.storage.boot_dir = boot_dir;
        }

        if let Ok(url) = std::env::var("KIOSKD_UPLINK_URL")
            && !url.is_empty()
        {
            self.uplink.base_url = Some(url);
        }

        if let Ok(level) = std::env::var("KIOSKD_LOG_LEVEL")
            && !level.is_empty()
        {
            self.observability.log_level = level;
        }
    }
}
