//! Connection pool - SQLite pool construction and schema migrations

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

/// Opens the database at `database_url` (created if missing) and applies migrations.
#[instrument(skip(database_url))]
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    sqlx::migrate!().run(&pool).await?;
    info!(max_connections, "Database ready");
    Ok(pool)
}

/// Private in-memory database, used by tests.
///
/// Every SQLite `:memory:` connection is a separate database, so the pool is
/// pinned to a single connection that never expires.
pub async fn connect_in_memory() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    sqlx::migrate!().run(&pool).await?;
    Ok(pool)
}

/// File-backed database with a real multi-connection pool, for tests that
/// need transactions to actually overlap.
#[cfg(test)]
pub(crate) async fn connect_temp_file(max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let dir = tempfile::tempdir().map_err(sqlx::Error::Io)?;
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("chat.db").display());
    // the pool outlives this function
    std::mem::forget(dir);
    connect(&url, max_connections).await
}
