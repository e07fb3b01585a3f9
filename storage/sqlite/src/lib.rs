//! Thread-safe, SQL-free access to an embedded SQLite database
//!
//! A [`Connection`] can be shared between threads (`Arc<Connection>`): reads run concurrently, writes
//! are serialized, and a [`Transaction`] holds off every other writer on the connection until it
//! finishes. Several connections may open the same file; they coordinate through SQLite's own
//! locking with a busy timeout (60 seconds unless configured otherwise).
//!
//! Common CRUD is expressed with table names, column names and [`KeyValue`] filters through the
//! [`TableOps`] trait, which both [`Connection`] and [`Transaction`] implement. Values are exchanged
//! as text (`Option<String>`, `None` being SQL NULL) and always bound as statement parameters.
//!
//! # Example
//!
//! ```rust
//! use sqlite_access::{key_values, Connection, TableOps};
//!
//! # fn main() -> sqlite_access::Result<()> {
//! let mut conn = Connection::new(":memory:");
//! assert!(conn.open());
//! conn.apply_sql("CREATE TABLE fruit(name TEXT, count INTEGER);")?;
//!
//! conn.insert("fruit", &key_values! { "name" => "apple", "count" => 3 })?;
//!
//! let tx = conn.begin_transaction(false)?;
//! tx.insert_rows("fruit", &[vec![Some("pear".into()), Some("2".into())], vec![Some("fig".into()), None]])?;
//! tx.commit()?;
//!
//! assert_eq!(conn.count("fruit", &[])?, 3);
//! assert_eq!(conn.sum("fruit", "count", &[])?, 5.0);
//! assert_eq!(conn.select_column("fruit", "count", &key_values! { "name" => "apple" })?, vec![vec![Some("3".to_string())]]);
//! # Ok(())
//! # }
//! ```

mod config;
mod connection;
mod error;
mod ops;
pub mod sql_builder;
mod transaction;
mod value;

pub use config::{ConnectionConfig, JournalMode, TransactionMode, DEFAULT_BUSY_TIMEOUT_MS, MAX_BUSY_TIMEOUT_MS};
pub use connection::Connection;
pub use error::{Result, SqliteError};
pub use ops::TableOps;
pub use transaction::Transaction;
pub use value::{IntoValue, KeyValue, KeyValues, PrimaryKey, PrimaryKeys, Row, Rows, Value};
