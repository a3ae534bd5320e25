mod env_overrides;
mod loader;
mod types;

pub use types::{AgentConfig, Config, StorageConfig};
