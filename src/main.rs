//! rimshot: play MIDI notes with any Linux input device
//!
//! Entry point: parse the CLI, set up logging, load the configuration and
//! run a session to completion. A fatal load error prints a diagnostic
//! and exits non-zero; a clean shutdown exits zero.

use anyhow::Result;
use clap::Parser;
use tracing::info;

mod cli;
use cli::Cli;

use rimshot::config::Config;
use rimshot::session::{Selection, Session};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config_path = cli.config.unwrap_or_else(Config::default_path);
    info!("loading config from {}", config_path.display());
    let config = Config::load(&config_path)?;

    let selection = Selection {
        input: cli.input,
        player: cli.player,
    };
    Session::new(config, config_path, selection).run().await
}
