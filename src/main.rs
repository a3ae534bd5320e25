#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

use anyhow::{Context, Result};
use clap::Parser;
use kioskd::Config;
use kioskd::cli::commands::Cli;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_init()?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.observability.level())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    kioskd::app::dispatch::dispatch(cli, config).await
}
