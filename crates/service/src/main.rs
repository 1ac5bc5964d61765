//! sealchat relay: user store, captcha-gated auth and the envelope relay
//!
//! The relay forwards encrypted envelopes between connected listeners and
//! never holds key material.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use common::relay::RelayPolicy;
use service::Config;

/// sealchat relay server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML file with server settings; flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address for the API and relay to listen on
    #[arg(short, long)]
    listen_addr: Option<SocketAddr>,

    /// Path to SQLite database file (in-memory if unset)
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Relay delivery policy (broadcast or targeted)
    #[arg(long)]
    relay_policy: Option<RelayPolicy>,

    /// Per-listener queue depth
    #[arg(long)]
    relay_buffer: Option<usize>,

    /// Seconds a captcha stays valid
    #[arg(long)]
    captcha_ttl: Option<u64>,

    /// Number of characters in a captcha
    #[arg(long)]
    captcha_length: Option<usize>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<tracing::Level>,

    /// Directory for daily rolling log files
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::default()
                .merge_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(addr) = self.listen_addr {
            config.api_listen_addr = addr;
        }
        if let Some(path) = self.database {
            config.sqlite_path = Some(path);
        }
        if let Some(policy) = self.relay_policy {
            config.relay_policy = policy;
        }
        if let Some(buffer) = self.relay_buffer {
            config.relay_buffer = buffer;
        }
        if let Some(secs) = self.captcha_ttl {
            config.captcha_ttl = Duration::from_secs(secs);
        }
        if let Some(length) = self.captcha_length {
            config.captcha_length = length;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(dir) = self.log_dir {
            config.log_dir = Some(dir);
        }

        Ok(config.validate()?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Args::parse().into_config()?;
    service::spawn_service(&config).await;
    Ok(())
}
