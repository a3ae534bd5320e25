mod containment;
mod core;
mod host;
mod location;
mod observability;
mod presentation;
mod uplink;

pub use containment::{ContainmentConfig, EnforcementBackend};
pub use core::{AgentConfig, Config, StorageConfig};
pub use host::{HostConfig, ShellMode};
pub use location::{EmergencyConfig, LocationConfig};
pub use observability::ObservabilityConfig;
pub use presentation::PresentationConfig;
pub use uplink::UplinkConfig;
