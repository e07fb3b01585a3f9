//! Ownership token for an open transaction

use std::sync::MutexGuard;

use tracing::warn;

use crate::connection::Connection;
use crate::error::Result;

/// An open transaction on a [`Connection`]
///
/// Holds the connection's write lock until it is committed, rolled back or dropped. Writes made
/// through it (via [`crate::TableOps`]) run inside the transaction without touching the lock again.
/// Dropping an unfinished transaction rolls it back.
///
/// Not `Send`: the transaction belongs to the thread that began it.
#[must_use = "a transaction rolls back when dropped; call commit() to keep its writes"]
pub struct Transaction<'c> {
    conn: &'c Connection,
    finished: bool,
    _guard: MutexGuard<'c, ()>,
}

impl<'c> Transaction<'c> {
    pub(crate) fn new(conn: &'c Connection, guard: MutexGuard<'c, ()>) -> Self { Self { conn, finished: false, _guard: guard } }

    pub fn connection(&self) -> &'c Connection { self.conn }

    pub fn commit(mut self) -> Result<()> {
        self.finished = true;
        self.conn.commit_transaction()
    }

    pub fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.conn.rollback_transaction()
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!("Transaction on {} dropped without commit, rolling back", self.conn.database_path().display());
        if let Err(err) = self.conn.rollback_transaction() {
            warn!("Implicit rollback failed: {}", err);
        }
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction").field("database", &self.conn.database_path()).field("finished", &self.finished).finish()
    }
}
