use serde::{Deserialize, Serialize};

/// How `run-command` and shell fallbacks are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellMode {
    /// Record the command against the simulated device.
    Simulate,
    /// Run through `sh -c` on this machine.
    System,
}

/// Profile of the simulated device used by the headless binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    #[serde(default = "default_true")]
    pub device_owner: bool,
    #[serde(default = "default_sdk_level")]
    pub sdk_level: u32,
    #[serde(default)]
    pub installed_packages: Vec<String>,
    #[serde(default = "default_input_methods")]
    pub input_methods: Vec<String>,
    /// Primary (policy) volume control is available.
    #[serde(default = "default_true")]
    pub volume_control: bool,
    /// Privileged brightness policy is available.
    #[serde(default = "default_true")]
    pub brightness_policy: bool,
    #[serde(default = "default_true")]
    pub wifi_enabled: bool,
    #[serde(default = "default_shell")]
    pub shell: ShellMode,
}

fn default_true() -> bool {
    true
}

fn default_sdk_level() -> u32 {
    33
}

fn default_input_methods() -> Vec<String> {
    vec!["com.android.inputmethod.latin".into()]
}

fn default_shell() -> ShellMode {
    ShellMode::Simulate
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            device_owner: true,
            sdk_level: default_sdk_level(),
            installed_packages: Vec::new(),
            input_methods: default_input_methods(),
            volume_control: true,
            brightness_policy: true,
            wifi_enabled: true,
            shell: default_shell(),
        }
    }
}
