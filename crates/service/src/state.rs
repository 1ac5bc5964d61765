use axum::extract::FromRef;
use url::Url;

use common::relay::RelayChannel;

use super::auth::AuthGate;
use super::config::Config;
use super::database::{Database, DatabaseSetupError};

/// Main service state, shared by every request handler
#[derive(Clone, Debug)]
pub struct State {
    database: Database,
    relay: RelayChannel,
    auth: AuthGate,
}

impl State {
    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        // 1. Setup database
        let sqlite_database_url = match config.sqlite_path {
            Some(ref path) => {
                // the file may be created, its directory must exist
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        return Err(StateSetupError::DatabasePathDoesNotExist);
                    }
                }
                Url::parse(&format!("sqlite://{}", path.display()))
                    .map_err(|_| StateSetupError::InvalidDatabaseUrl)
            }
            // otherwise just set up an in-memory database
            None => Url::parse("sqlite::memory:").map_err(|_| StateSetupError::InvalidDatabaseUrl),
        }?;
        tracing::info!("Database URL: {:?}", sqlite_database_url);
        let database = Database::connect(&sqlite_database_url).await?;

        // 2. Setup relay
        let relay = RelayChannel::new(config.relay_policy, config.relay_buffer);
        tracing::info!(
            policy = ?config.relay_policy,
            buffer = config.relay_buffer,
            "relay configured"
        );

        // 3. Setup auth gate
        let auth = AuthGate::new(config.captcha_ttl, config.captcha_length);

        Ok(Self::new(database, relay, auth))
    }

    pub fn new(database: Database, relay: RelayChannel, auth: AuthGate) -> Self {
        Self {
            database,
            relay,
            auth,
        }
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn relay(&self) -> &RelayChannel {
        &self.relay
    }

    pub fn auth(&self) -> &AuthGate {
        &self.auth
    }
}

impl AsRef<Database> for State {
    fn as_ref(&self) -> &Database {
        &self.database
    }
}

impl FromRef<State> for Database {
    fn from_ref(state: &State) -> Self {
        state.database.clone()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("Database path does not exist")]
    DatabasePathDoesNotExist,
    #[error("Database setup error")]
    DatabaseSetupError(#[from] DatabaseSetupError),
    #[error("Invalid database URL")]
    InvalidDatabaseUrl,
}
