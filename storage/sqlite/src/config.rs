//! Per-connection settings

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SqliteError};

/// How long a connection keeps retrying when another connection holds a conflicting file lock
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 60_000;

/// SQLite takes the busy timeout as a C `int` of milliseconds
pub const MAX_BUSY_TIMEOUT_MS: u64 = i32::MAX as u64;

/// Settings applied when a [`crate::Connection`] is opened
///
/// Deserializable so it can be embedded in an application's own configuration file; every field is
/// optional and falls back to [`ConnectionConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Busy timeout in milliseconds
    pub busy_timeout_ms: u64,
    /// Journal mode to set on open. `None` keeps whatever the database file already uses.
    pub journal_mode: Option<JournalMode>,
    /// Locking behavior of `begin_transaction`
    pub transaction_behavior: TransactionMode,
}

impl Default for ConnectionConfig {
    fn default() -> Self { Self { busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS, journal_mode: None, transaction_behavior: TransactionMode::Deferred } }
}

impl ConnectionConfig {
    /// Parse from JSON and validate
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ConnectionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.busy_timeout_ms == 0 {
            return Err(SqliteError::Config("busy_timeout_ms must be greater than zero".to_string()));
        }
        if self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(SqliteError::Config(format!("busy_timeout_ms must be at most {}", MAX_BUSY_TIMEOUT_MS)));
        }
        Ok(())
    }

    pub fn busy_timeout(&self) -> Duration { Duration::from_millis(self.busy_timeout_ms) }

    /// Clamped to [`MAX_BUSY_TIMEOUT_MS`]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX).min(MAX_BUSY_TIMEOUT_MS);
        self
    }

    pub fn with_journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = Some(mode);
        self
    }

    pub fn with_transaction_behavior(mut self, mode: TransactionMode) -> Self {
        self.transaction_behavior = mode;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalMode {
    Delete,
    Truncate,
    Persist,
    Memory,
    Wal,
    Off,
}

impl JournalMode {
    pub fn pragma_value(&self) -> &'static str {
        match self {
            JournalMode::Delete => "DELETE",
            JournalMode::Truncate => "TRUNCATE",
            JournalMode::Persist => "PERSIST",
            JournalMode::Memory => "MEMORY",
            JournalMode::Wal => "WAL",
            JournalMode::Off => "OFF",
        }
    }
}

/// Which lock SQLite takes when a transaction begins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionMode {
    /// Plain `BEGIN`: locks are taken lazily by the first read or write
    #[default]
    Deferred,
    /// `BEGIN IMMEDIATE`: the write lock is taken up front
    Immediate,
    /// `BEGIN EXCLUSIVE`
    Exclusive,
}

impl TransactionMode {
    pub fn begin_sql(&self) -> &'static str {
        match self {
            TransactionMode::Deferred => "BEGIN;",
            TransactionMode::Immediate => "BEGIN IMMEDIATE;",
            TransactionMode::Exclusive => "BEGIN EXCLUSIVE;",
        }
    }
}
