// CLI definitions using clap

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rimshot")]
#[command(author, version, about = "Play MIDI notes with any Linux input device")]
pub struct Cli {
    /// Config file path (default: ./rimshot.toml, then the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Only use the input section with this name (or backend type)
    #[arg(short, long, value_name = "SECTION")]
    pub input: Option<String>,

    /// Only use the player section with this name (or backend type)
    #[arg(short, long, value_name = "SECTION")]
    pub player: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}
