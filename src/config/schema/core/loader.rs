use super::Config;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let kioskd_dir = config_dir()?;
        let config_path = kioskd_dir.join("config.toml");

        if !kioskd_dir.exists() {
            fs::create_dir_all(&kioskd_dir).context("Failed to create .kioskd directory")?;
        }

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let mut config = Self {
                config_path: config_path.clone(),
                ..Self::default()
            };
            config.apply_env_overrides();
            config.validate()?;
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.config_path = path.to_path_buf();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        if let Some(parent) = self.config_path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}

fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("KIOSKD_HOME")
        && !dir.is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    let home = UserDirs::new()
        .map(|u| u.home_dir().to_path_buf())
        .context("Could not find home directory")?;
    Ok(home.join(".kioskd"))
}
