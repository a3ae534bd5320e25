pub mod hot_reload;
pub mod schema;

pub use hot_reload::ConfigHandle;
pub use schema::{
    AgentConfig, Config, ContainmentConfig, EmergencyConfig, EnforcementBackend, HostConfig,
    LocationConfig, ObservabilityConfig, PresentationConfig, ShellMode, StorageConfig,
    UplinkConfig,
};
