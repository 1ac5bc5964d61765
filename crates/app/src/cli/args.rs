pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "sealchat")]
#[command(about = "End-to-end encrypted two-party chat over a sealchat relay")]
pub struct Args {
    /// Relay server URL (defaults to the configured remote)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the sealchat config directory (defaults to ~/.sealchat)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Log diagnostics to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: crate::Command,
}
