// ABOUTME: Database connection management
// ABOUTME: Builds the SQLite pool with WAL and foreign keys enabled and applies migrations

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::{StorageError, StorageResult};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const MAX_CONNECTIONS: u32 = 10;

/// Open (creating if needed) the database at `database_url` and migrate it.
///
/// Accepts `sqlite:` URLs or a bare file path.
pub async fn connect(database_url: &str) -> StorageResult<SqlitePool> {
    let options = if database_url.starts_with("sqlite:") {
        SqliteConnectOptions::from_str(database_url)?
    } else {
        SqliteConnectOptions::new().filename(database_url)
    };

    let filename = options.get_filename().to_path_buf();
    if let Some(parent) = filename.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent).await?;
    }

    let options = options
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(30));

    debug!("Connecting to database: {}", filename.display());

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(30))
        .connect_with(options)
        .await?;

    info!("Database connection established");

    MIGRATOR.run(&pool).await?;
    debug!("Database migrations completed");

    Ok(pool)
}

/// Private in-memory database, migrated. A single connection keeps every
/// query on the same memory store.
pub async fn connect_in_memory() -> StorageResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    MIGRATOR.run(&pool).await?;
    Ok(pool)
}

async fn ensure_dir(dir: &Path) -> StorageResult<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(StorageError::Io)
}
