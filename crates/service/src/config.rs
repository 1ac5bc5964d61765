use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use serde::Deserialize;

use common::relay::{RelayPolicy, DEFAULT_LISTENER_CAPACITY};

pub const DEFAULT_API_PORT: u16 = 5000;
pub const DEFAULT_CAPTCHA_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_CAPTCHA_LENGTH: usize = 6;

#[derive(Debug, Clone)]
pub struct Config {
    // http server configuration
    /// address for the API server to listen on
    pub api_listen_addr: SocketAddr,

    // data store configuration
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,

    // relay configuration
    /// who receives a published envelope
    pub relay_policy: RelayPolicy,
    /// per-listener queue depth before events are dropped
    pub relay_buffer: usize,

    // auth configuration
    /// how long an issued captcha stays valid
    pub captcha_ttl: Duration,
    pub captcha_length: usize,

    // misc
    pub log_level: tracing::Level,
    /// directory for daily rolling log files, stdout only if unset
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_listen_addr: SocketAddr::new(
                IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
                DEFAULT_API_PORT,
            ),
            sqlite_path: None,
            relay_policy: RelayPolicy::default(),
            relay_buffer: DEFAULT_LISTENER_CAPACITY,
            captcha_ttl: DEFAULT_CAPTCHA_TTL,
            captcha_length: DEFAULT_CAPTCHA_LENGTH,
            log_level: tracing::Level::INFO,
            log_dir: None,
        }
    }
}

/// On-disk form of [`Config`]; every field is optional and only overrides
/// what it sets
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    api_listen_addr: Option<SocketAddr>,
    sqlite_path: Option<PathBuf>,
    relay_policy: Option<RelayPolicy>,
    relay_buffer: Option<usize>,
    captcha_ttl_secs: Option<u64>,
    captcha_length: Option<usize>,
    log_level: Option<String>,
    log_dir: Option<PathBuf>,
}

impl Config {
    /// Overlay the settings found in a TOML file
    pub fn merge_file(mut self, path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&raw)?;

        if let Some(addr) = file.api_listen_addr {
            self.api_listen_addr = addr;
        }
        if let Some(path) = file.sqlite_path {
            self.sqlite_path = Some(path);
        }
        if let Some(policy) = file.relay_policy {
            self.relay_policy = policy;
        }
        if let Some(buffer) = file.relay_buffer {
            self.relay_buffer = buffer;
        }
        if let Some(secs) = file.captcha_ttl_secs {
            self.captcha_ttl = Duration::from_secs(secs);
        }
        if let Some(length) = file.captcha_length {
            self.captcha_length = length;
        }
        if let Some(level) = file.log_level {
            self.log_level = tracing::Level::from_str(&level)
                .map_err(|_| ConfigError::InvalidLogLevel(level))?;
        }
        if let Some(dir) = file.log_dir {
            self.log_dir = Some(dir);
        }

        self.validate()
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.relay_buffer == 0 {
            return Err(ConfigError::Invalid("relay_buffer must be at least 1".into()));
        }
        if self.captcha_length == 0 {
            return Err(ConfigError::Invalid("captcha_length must be at least 1".into()));
        }
        if self.captcha_ttl.is_zero() {
            return Err(ConfigError::Invalid("captcha_ttl must be non-zero".into()));
        }
        Ok(self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_listen_addr.port(), 5000);
        assert_eq!(config.relay_policy, RelayPolicy::Broadcast);
        assert_eq!(config.relay_buffer, 256);
        assert_eq!(config.captcha_ttl, Duration::from_secs(300));
        assert_eq!(config.captcha_length, 6);
        assert!(config.sqlite_path.is_none());
    }

    #[test]
    fn test_merge_file_overrides_only_set_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            api_listen_addr = "127.0.0.1:7000"
            relay_policy = "targeted"
            captcha_ttl_secs = 60
            log_level = "debug"
            "#
        )
        .unwrap();

        let config = Config::default().merge_file(file.path()).unwrap();
        assert_eq!(config.api_listen_addr.port(), 7000);
        assert_eq!(config.relay_policy, RelayPolicy::Targeted);
        assert_eq!(config.captcha_ttl, Duration::from_secs(60));
        assert_eq!(config.log_level, tracing::Level::DEBUG);
        assert_eq!(config.captcha_length, 6);
    }

    #[test]
    fn test_merge_file_rejects_unknown_and_invalid() {
        let mut unknown = tempfile::NamedTempFile::new().unwrap();
        writeln!(unknown, "listen = \"x\"").unwrap();
        assert!(matches!(
            Config::default().merge_file(unknown.path()),
            Err(ConfigError::Parse(_))
        ));

        let mut zero = tempfile::NamedTempFile::new().unwrap();
        writeln!(zero, "relay_buffer = 0").unwrap();
        assert!(matches!(
            Config::default().merge_file(zero.path()),
            Err(ConfigError::Invalid(_))
        ));

        let mut level = tempfile::NamedTempFile::new().unwrap();
        writeln!(level, "log_level = \"loud\"").unwrap();
        assert!(matches!(
            Config::default().merge_file(level.path()),
            Err(ConfigError::InvalidLogLevel(_))
        ));
    }
}
