use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::keystore::FileKeyStore;

pub const APP_NAME: &str = "sealchat";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const KEYS_DIR_NAME: &str = "keys";
pub const DEFAULT_REMOTE: &str = "http://localhost:5000";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    /// Relay server the CLI talks to
    #[serde(default = "default_remote")]
    pub remote: Url,
}

fn default_remote() -> Url {
    Url::parse(DEFAULT_REMOTE).expect("hardcoded URL must parse")
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            remote: default_remote(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the sealchat directory (~/.sealchat)
    pub sealchat_dir: PathBuf,
    /// Directory holding one key pair file per identity
    pub keys_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the sealchat directory path (custom or default ~/.sealchat)
    pub fn sealchat_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new sealchat state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let sealchat_dir = Self::sealchat_dir(custom_path)?;

        if sealchat_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&sealchat_dir)?;

        let keys_path = sealchat_dir.join(KEYS_DIR_NAME);
        fs::create_dir_all(&keys_path)?;

        let config = config.unwrap_or_default();
        let config_path = sealchat_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        Ok(Self {
            sealchat_dir,
            keys_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the sealchat directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let sealchat_dir = Self::sealchat_dir(custom_path)?;

        if !sealchat_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let keys_path = sealchat_dir.join(KEYS_DIR_NAME);
        let config_path = sealchat_dir.join(CONFIG_FILE_NAME);

        if !keys_path.exists() {
            return Err(StateError::MissingFile(format!("{}/", KEYS_DIR_NAME)));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            sealchat_dir,
            keys_path,
            config_path,
            config,
        })
    }

    pub fn key_store(&self) -> FileKeyStore {
        FileKeyStore::new(self.keys_path.clone())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("sealchat directory not initialized. Run 'sealchat init' first")]
    NotInitialized,

    #[error("sealchat directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("state");
        let config = AppConfig {
            remote: Url::parse("http://relay.local:7000").unwrap(),
        };

        let state = AppState::init(Some(dir.clone()), Some(config.clone())).unwrap();
        assert!(state.keys_path.is_dir());

        let loaded = AppState::load(Some(dir)).unwrap();
        assert_eq!(loaded.config, config);
    }

    #[test]
    fn test_init_twice_and_load_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("state");

        assert!(matches!(
            AppState::load(Some(dir.clone())),
            Err(StateError::NotInitialized)
        ));
        AppState::init(Some(dir.clone()), None).unwrap();
        assert!(matches!(
            AppState::init(Some(dir), None),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_config_defaults_remote() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.remote.as_str(), "http://localhost:5000/");
    }
}
