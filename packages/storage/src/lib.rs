// ABOUTME: Data layer and persistence for prdsmith
// ABOUTME: SQLite pool setup, embedded migrations and per-table storage types

pub mod analytics;
pub mod db;
pub mod messages;
pub mod prds;
pub mod sessions;

use thiserror::Error;

pub use analytics::{AnalyticsStorage, DailyStats, EventType, NewEvent};
pub use db::{connect, connect_in_memory, MIGRATOR};
pub use messages::MessageStorage;
pub use prds::PrdStorage;
pub use sessions::SessionStorage;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0} not found")]
    NotFound(String),
    #[error("Invalid stored value: {0}")]
    InvalidData(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
