//! Connection to a SQLite database file
//!
//! A [`Connection`] owns one rusqlite handle and is shared between threads with `Arc<Connection>`.
//! Writes from all threads are serialized by a per-connection write lock; reads only take the
//! short-lived handle mutex, which is released after every statement. Separate connections to the
//! same file coordinate through SQLite's file locks and the configured busy timeout.
//!
//! Lock order is always write lock, then handle mutex.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use rusqlite::types::FromSql;
use rusqlite::{params_from_iter, OpenFlags};
use tracing::{debug, error, warn};

use crate::config::ConnectionConfig;
use crate::error::{Result, SqliteError};
use crate::sql_builder::{self, Statement};
use crate::transaction::Transaction;
use crate::value::{decode, row_params, PrimaryKey, PrimaryKeys, Row, Rows};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransactionState {
    Idle,
    Open { owner: ThreadId },
}

/// How a write gets its exclusivity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    /// Take the write lock for the duration of the statement
    Exclusive,
    /// The caller is a [`Transaction`], which already holds the write lock
    InTransaction,
}

#[derive(Debug)]
pub struct Connection {
    path: PathBuf,
    config: ConnectionConfig,
    handle: Option<Mutex<rusqlite::Connection>>,
    write_lock: Mutex<()>,
    state: Mutex<TransactionState>,
}

impl Connection {
    /// An unopened connection to `path` with the default configuration
    pub fn new(path: impl Into<PathBuf>) -> Self { Self::with_config(path, ConnectionConfig::default()) }

    pub fn with_config(path: impl Into<PathBuf>, config: ConnectionConfig) -> Self {
        Self { path: path.into(), config, handle: None, write_lock: Mutex::new(()), state: Mutex::new(TransactionState::Idle) }
    }

    /// Open (or create) the database file. Returns false on failure, leaving the connection as it was.
    ///
    /// Opening an already open connection replaces its handle.
    pub fn open(&mut self) -> bool {
        match self.try_open() {
            Ok(()) => true,
            Err(err) => {
                error!("Failed to open database {}: {}", self.path.display(), err);
                false
            }
        }
    }

    pub fn try_open(&mut self) -> Result<()> {
        self.config.validate()?;

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX
            | OpenFlags::SQLITE_OPEN_URI;
        let conn = rusqlite::Connection::open_with_flags(&self.path, flags)?;
        conn.busy_timeout(self.config.busy_timeout())?;
        if let Some(mode) = self.config.journal_mode {
            conn.execute_batch(&format!("PRAGMA journal_mode={};", mode.pragma_value()))?;
        }

        debug!("Opened database {} (busy timeout {:?})", self.path.display(), self.config.busy_timeout());
        self.handle = Some(Mutex::new(conn));
        Ok(())
    }

    pub fn is_open(&self) -> bool { self.handle.is_some() }

    pub fn database_path(&self) -> &Path { &self.path }

    pub fn config(&self) -> &ConnectionConfig { &self.config }

    /// True while a [`Transaction`] on this connection is open, on any thread
    pub fn in_transaction(&self) -> bool { *self.lock_state() != TransactionState::Idle }

    /// Start a transaction owned by the calling thread
    ///
    /// Blocks while another thread holds the write lock. Until the returned [`Transaction`] is
    /// committed, rolled back or dropped, plain writes on this connection from other threads wait, and
    /// plain writes from this thread fail with [`SqliteError::TransactionInProgress`].
    pub fn begin_transaction(&self, enable_foreign_keys: bool) -> Result<Transaction<'_>> {
        let guard = self.lock_write()?;

        let foreign_keys = if enable_foreign_keys { "ON" } else { "OFF" };
        let begin = self.config.transaction_behavior.begin_sql();
        self.with_handle(|conn| Ok(conn.execute_batch(&format!("PRAGMA foreign_keys={}; {}", foreign_keys, begin))?))?;

        self.set_state(TransactionState::Open { owner: thread::current().id() });
        debug!("Began transaction on {} ({})", self.path.display(), begin);
        Ok(Transaction::new(self, guard))
    }

    /// Issue COMMIT for the open transaction. A failed commit is rolled back before the error is returned.
    pub(crate) fn commit_transaction(&self) -> Result<()> {
        let result = self.with_handle(|conn| match conn.execute_batch("COMMIT;") {
            Ok(()) => Ok(()),
            Err(err) => {
                if !conn.is_autocommit() {
                    if let Err(rollback_err) = conn.execute_batch("ROLLBACK;") {
                        warn!("Rollback after failed commit also failed: {}", rollback_err);
                    }
                }
                Err(err.into())
            }
        });
        self.set_state(TransactionState::Idle);
        if result.is_ok() {
            debug!("Committed transaction on {}", self.path.display());
        }
        result
    }

    pub(crate) fn rollback_transaction(&self) -> Result<()> {
        // SQLite may already have rolled back on its own (e.g. after an I/O error)
        let result = self.with_handle(|conn| if conn.is_autocommit() { Ok(()) } else { Ok(conn.execute_batch("ROLLBACK;")?) });
        self.set_state(TransactionState::Idle);
        debug!("Rolled back transaction on {}", self.path.display());
        result
    }

    /// Run a read statement and decode every row
    pub(crate) fn query(&self, stmt: &Statement) -> Result<Rows> {
        debug!("Built SQL: {}", stmt.sql);
        self.with_handle(|conn| {
            let mut prepared = conn.prepare(&stmt.sql)?;
            let columns = prepared.column_count();
            let mut rows = prepared.query(params_from_iter(stmt.params.iter()))?;

            let mut result = Rows::new();
            while let Some(row) = rows.next()? {
                result.push((0..columns).map(|i| row.get_ref(i).map(decode)).collect::<rusqlite::Result<Row>>()?);
            }
            Ok(result)
        })
        .inspect_err(|err| warn!("Query failed: {}: {}", stmt.sql, err))
    }

    /// Run a read statement returning a single value
    pub(crate) fn query_scalar<T: FromSql>(&self, stmt: &Statement) -> Result<T> {
        debug!("Built SQL: {}", stmt.sql);
        self.with_handle(|conn| Ok(conn.query_row(&stmt.sql, params_from_iter(stmt.params.iter()), |row| row.get(0))?))
            .inspect_err(|err| warn!("Query failed: {}: {}", stmt.sql, err))
    }

    /// Execute a write statement, returning the number of rows it changed
    pub(crate) fn execute(&self, access: Access, stmt: &Statement) -> Result<usize> {
        debug!("Built SQL: {}", stmt.sql);
        let _guard = self.write(access)?;
        self.with_handle(|conn| Ok(conn.execute(&stmt.sql, params_from_iter(stmt.params.iter()))?))
            .inspect_err(|err| warn!("Statement failed: {}: {}", stmt.sql, err))
    }

    /// Execute an insert and return the rowid it assigned, read before the write lock is released
    pub(crate) fn insert_row(&self, access: Access, stmt: &Statement) -> Result<PrimaryKey> {
        debug!("Built SQL: {}", stmt.sql);
        let _guard = self.write(access)?;
        self.with_handle(|conn| {
            conn.execute(&stmt.sql, params_from_iter(stmt.params.iter()))?;
            Ok(conn.last_insert_rowid())
        })
        .inspect_err(|err| warn!("Insert failed: {}: {}", stmt.sql, err))
    }

    /// Insert positional rows through one prepared statement, under a single hold of the write lock
    pub(crate) fn insert_many(&self, access: Access, table: &str, rows: &[Row], replace: bool) -> Result<PrimaryKeys> {
        let Some(first) = rows.first() else {
            return Ok(PrimaryKeys::new());
        };
        let stmt = sql_builder::insert_placeholders(table, first.len(), replace)?;
        debug!("Built SQL: {} (x{})", stmt.sql, rows.len());

        let _guard = self.write(access)?;
        self.with_handle(|conn| {
            let mut prepared = conn.prepare(&stmt.sql)?;
            let mut keys = PrimaryKeys::with_capacity(rows.len());
            for row in rows {
                prepared.execute(params_from_iter(row_params(row)))?;
                keys.push(conn.last_insert_rowid());
            }
            Ok(keys)
        })
        .inspect_err(|err| warn!("Bulk insert into {} failed: {}", table, err))
    }

    /// Execute caller-written SQL, possibly several statements
    pub(crate) fn execute_batch(&self, access: Access, sql: &str) -> Result<()> {
        debug!("Applying SQL: {}", sql);
        let _guard = self.write(access)?;
        self.with_handle(|conn| Ok(conn.execute_batch(sql)?)).inspect_err(|err| warn!("Applying SQL failed: {}", err))
    }

    fn write(&self, access: Access) -> Result<Option<MutexGuard<'_, ()>>> {
        match access {
            Access::Exclusive => self.lock_write().map(Some),
            Access::InTransaction => Ok(None),
        }
    }

    fn lock_write(&self) -> Result<MutexGuard<'_, ()>> {
        // The owner of an open transaction already holds the lock; waiting on it would never return
        if let TransactionState::Open { owner } = *self.lock_state() {
            if owner == thread::current().id() {
                return Err(SqliteError::TransactionInProgress);
            }
        }
        Ok(self.write_lock.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn with_handle<T>(&self, f: impl FnOnce(&rusqlite::Connection) -> Result<T>) -> Result<T> {
        let handle = self.handle.as_ref().ok_or_else(|| SqliteError::NotOpen(self.path.clone()))?;
        let conn = handle.lock().unwrap_or_else(PoisonError::into_inner);
        f(&conn)
    }

    fn lock_state(&self) -> MutexGuard<'_, TransactionState> { self.state.lock().unwrap_or_else(PoisonError::into_inner) }

    fn set_state(&self, state: TransactionState) { *self.lock_state() = state; }
}
