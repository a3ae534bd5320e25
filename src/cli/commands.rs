use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `kioskd` - on-device control agent for managed kiosk tablets.
#[derive(Parser, Debug)]
#[command(name = "kioskd")]
#[command(version)]
#[command(about = "On-device control agent for managed kiosk tablets.", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the agent and process commands until Ctrl-C
    Run {
        /// NDJSON command file (one `{"messageType", "payload"}` per line); stdin when omitted
        #[arg(long)]
        commands: Option<PathBuf>,
    },

    /// Read the persisted lock state and present the lock surface if set
    BootCheck,

    /// Show configuration and the last status snapshot
    Status,
}
