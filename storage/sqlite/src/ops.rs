//! Table operations shared by [`Connection`] and [`Transaction`]
//!
//! The same calls work inside and outside a transaction, so helpers can take `&dyn TableOps`.

use tracing::debug;

use crate::connection::{Access, Connection};
use crate::error::{Result, SqliteError};
use crate::sql_builder::{self, Aggregate, Column};
use crate::transaction::Transaction;
use crate::value::{KeyValue, PrimaryKey, PrimaryKeys, Row, Rows};

mod sealed {
    use crate::connection::Connection;

    pub trait Sealed {
        fn target_connection(&self) -> &Connection;
        /// True when the caller already holds the connection's write lock
        fn holds_write_lock(&self) -> bool;
    }
}

/// The connection to run on, and whether writes must take its write lock
fn target<T: sealed::Sealed + ?Sized>(ops: &T) -> (&Connection, Access) {
    let access = if ops.holds_write_lock() { Access::InTransaction } else { Access::Exclusive };
    (ops.target_connection(), access)
}

/// CRUD against a single table without writing SQL
///
/// Values are compared and stored as text; see [`crate::IntoValue`] for how typed inputs are encoded.
/// Filters are ANDed equality tests (`IS NULL` for absent values). Passing no filters to
/// [`update`](TableOps::update) or [`delete_rows`](TableOps::delete_rows) affects every row.
pub trait TableOps: sealed::Sealed {
    /// Every column of the matching rows
    fn select(&self, table: &str, filters: &[KeyValue]) -> Result<Rows> { self.select_column(table, "*", filters) }

    /// One column (or `"*"`) of the matching rows
    fn select_column(&self, table: &str, column: &str, filters: &[KeyValue]) -> Result<Rows> {
        let (conn, _) = target(self);
        conn.query(&sql_builder::select(table, Column::from(column), filters))
    }

    /// Insert one row from named columns, returning its rowid
    fn insert(&self, table: &str, key_values: &[KeyValue]) -> Result<PrimaryKey> {
        let (conn, access) = target(self);
        conn.insert_row(access, &sql_builder::insert(table, key_values, false)?)
    }

    /// Insert or replace one row from named columns, returning its rowid
    fn insert_or_replace(&self, table: &str, key_values: &[KeyValue]) -> Result<PrimaryKey> {
        let (conn, access) = target(self);
        conn.insert_row(access, &sql_builder::insert(table, key_values, true)?)
    }

    /// Insert positional rows (values in the table's column order), returning one rowid per row
    fn insert_rows(&self, table: &str, rows: &[Row]) -> Result<PrimaryKeys> {
        let (conn, access) = target(self);
        conn.insert_many(access, table, rows, false)
    }

    fn insert_or_replace_rows(&self, table: &str, rows: &[Row]) -> Result<PrimaryKeys> {
        let (conn, access) = target(self);
        conn.insert_many(access, table, rows, true)
    }

    /// Returns the number of rows changed
    fn update(&self, table: &str, assignments: &[KeyValue], filters: &[KeyValue]) -> Result<usize> {
        if filters.is_empty() {
            debug!("Update of {} has no filters; every row is affected", table);
        }
        let (conn, access) = target(self);
        conn.execute(access, &sql_builder::update(table, assignments, filters)?)
    }

    /// Returns the number of rows deleted
    fn delete_rows(&self, table: &str, filters: &[KeyValue]) -> Result<usize> {
        if filters.is_empty() {
            debug!("Delete from {} has no filters; every row is affected", table);
        }
        let (conn, access) = target(self);
        conn.execute(access, &sql_builder::delete(table, filters))
    }

    fn count(&self, table: &str, filters: &[KeyValue]) -> Result<usize> { self.count_column(table, "*", filters) }

    /// Number of matching rows where `column` is not NULL
    fn count_column(&self, table: &str, column: &str, filters: &[KeyValue]) -> Result<usize> {
        let (conn, _) = target(self);
        let count: i64 = conn.query_scalar(&sql_builder::aggregate(Aggregate::Count, table, Column::from(column), filters))?;
        // COUNT is never negative, so only a count beyond usize (on 32-bit targets) can fail here
        usize::try_from(count).map_err(|_| SqliteError::from(rusqlite::Error::IntegralValueOutOfRange(0, count)))
    }

    /// 0.0 when nothing matches or every value is NULL
    fn sum(&self, table: &str, column: &str, filters: &[KeyValue]) -> Result<f64> {
        let (conn, _) = target(self);
        let sum: Option<f64> = conn.query_scalar(&sql_builder::aggregate(Aggregate::Sum, table, Column::from(column), filters))?;
        Ok(sum.unwrap_or(0.0))
    }

    /// 0.0 when nothing matches or every value is NULL
    fn average(&self, table: &str, column: &str, filters: &[KeyValue]) -> Result<f64> {
        let (conn, _) = target(self);
        let avg: Option<f64> = conn.query_scalar(&sql_builder::aggregate(Aggregate::Avg, table, Column::from(column), filters))?;
        Ok(avg.unwrap_or(0.0))
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        let rows = self.select_column("sqlite_master", "name", &[KeyValue::new("type", "table"), KeyValue::new("name", table)])?;
        Ok(rows.first().and_then(|row| row.first()).is_some_and(Option::is_some))
    }

    /// Execute caller-written SQL (schema changes and the like), possibly several statements
    fn apply_sql(&self, sql: &str) -> Result<()> {
        let (conn, access) = target(self);
        conn.execute_batch(access, sql)
    }
}

impl sealed::Sealed for Connection {
    fn target_connection(&self) -> &Connection { self }

    fn holds_write_lock(&self) -> bool { false }
}

impl TableOps for Connection {}

impl sealed::Sealed for Transaction<'_> {
    fn target_connection(&self) -> &Connection { self.connection() }

    fn holds_write_lock(&self) -> bool { true }
}

impl TableOps for Transaction<'_> {}
