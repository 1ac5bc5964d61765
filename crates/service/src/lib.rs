//! Relay server for sealchat.
//!
//! This crate provides the server-side components:
//! - Database (SQLite user store and message log)
//! - Auth (captcha-gated registration and login, Argon2 password hashes)
//! - HTTP API (users, legacy chat, relay publish and WebSocket relay)
//! - Process bootstrap (logging, graceful shutdown)
//! - A typed API client shared with the CLI

pub mod auth;
pub mod config;
pub mod database;
pub mod http;
pub mod process;
pub mod state;

pub use auth::{AuthError, AuthGate, CaptchaChallenge, SessionId};
pub use config::{Config, ConfigError};
pub use database::{Database, DatabaseSetupError};
pub use process::{spawn_service, start_service, ShutdownHandle};
pub use state::{State as ServiceState, StateSetupError};
