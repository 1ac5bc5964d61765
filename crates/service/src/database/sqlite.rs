use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use super::DatabaseSetupError;

pub async fn connect_sqlite(database_url: &url::Url) -> Result<SqlitePool, DatabaseSetupError> {
    let in_memory = database_url.as_str().contains(":memory:");

    let options = SqliteConnectOptions::from_str(database_url.as_str())
        .map_err(DatabaseSetupError::Unavailable)?
        .create_if_missing(true);

    // every connection to :memory: is its own database, so pin exactly one
    let pool = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options.journal_mode(SqliteJournalMode::Memory))
            .await
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options.journal_mode(SqliteJournalMode::Wal))
            .await
    }
    .map_err(DatabaseSetupError::Unavailable)?;

    Ok(pool)
}

pub async fn migrate_sqlite(pool: &SqlitePool) -> Result<(), DatabaseSetupError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(DatabaseSetupError::MigrationFailed)
}
