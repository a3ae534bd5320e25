use crate::cli::commands::{Cli, Commands};
use crate::config::{Config, ConfigHandle};
use crate::app::status::render_status;
use crate::lock::{LockStateStore, early_lock_check};
use crate::platform::host::HostDevice;
use crate::transport::{CommandSource, NdjsonSource};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Run { commands } => {
            let source: Arc<dyn CommandSource> = match commands {
                Some(path) => {
                    info!(path = %path.display(), "reading commands from file");
                    Arc::new(NdjsonSource::file(path))
                }
                None => Arc::new(NdjsonSource::stdin()),
            };
            crate::platform::daemon::run(ConfigHandle::new(config), source).await
        }

        Commands::BootCheck => {
            let store = LockStateStore::open(&config.storage.boot_dir());
            let device = HostDevice::from_config(&config.host);
            let locked = early_lock_check(&store, &device);
            println!(
                "{} ({})",
                if locked { "locked" } else { "unlocked" },
                store.path().display()
            );
            Ok(())
        }

        Commands::Status => {
            println!("{}", render_status(&config));
            Ok(())
        }
    }
}
