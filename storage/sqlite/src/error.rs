//! Error types for the SQLite access layer

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqliteError {
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),

    #[error("SQL generation error: {0}")]
    SqlGeneration(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database {} is not open", .0.display())]
    NotOpen(PathBuf),

    /// A plain write (or a second `begin_transaction`) was issued by the thread that owns the open transaction.
    /// Such writes must go through the [`crate::Transaction`] token instead.
    #[error("A transaction is already open on this thread; issue writes through its Transaction")]
    TransactionInProgress,
}

impl SqliteError {
    /// True if SQLite gave up waiting for a lock held by another connection (busy timeout elapsed)
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SqliteError::Rusqlite(rusqlite::Error::SqliteFailure(err, _))
                if matches!(err.code, rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
        )
    }
}

pub type Result<T, E = SqliteError> = std::result::Result<T, E>;
