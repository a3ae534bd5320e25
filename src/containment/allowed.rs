use crate::device::DeviceConfig;
use std::collections::BTreeSet;

/// Packages allowed in the foreground. Recomputed for every check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedAppSet {
    packages: BTreeSet<String>,
}

impl AllowedAppSet {
    /// The agent and the system UI are always present, even without a
    /// configuration. Applications flagged for removal are left out.
    pub fn build(
        agent_package: &str,
        system_ui_package: &str,
        config: Option<&DeviceConfig>,
        input_methods: &[String],
    ) -> Self {
        let mut packages = BTreeSet::new();
        packages.insert(agent_package.to_string());
        packages.insert(system_ui_package.to_string());

        if let Some(config) = config {
            packages.extend(
                config
                    .applications()
                    .iter()
                    .filter(|app| !app.is_removed())
                    .filter_map(|app| app.package())
                    .map(str::to_string),
            );
            if let Some(main) = config.main_app.as_deref().filter(|m| !m.is_empty()) {
                packages.insert(main.to_string());
            }
        }
        packages.extend(input_methods.iter().cloned());

        Self { packages }
    }

    pub fn contains(&self, package: &str) -> bool {
        self.packages.contains(package)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.packages.iter().map(String::as_str)
    }
}
