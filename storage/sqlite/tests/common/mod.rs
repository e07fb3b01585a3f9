use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use sqlite_access::{key_values, Connection, ConnectionConfig, Row, TableOps};
use tempfile::TempDir;
use tracing::Level;

pub const TEST_TABLE: &str = "test_table";

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() {
    // if LOG_LEVEL env var is set, use it
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        tracing_subscriber::fmt().with_max_level(Level::from_str(&level).unwrap()).with_test_writer().init();
    } else {
        tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().init();
    }
}

/// A database file in a temporary directory holding an empty `test_table (number INTEGER, string TEXT)`
pub struct TestDb {
    _dir: TempDir,
    path: PathBuf,
}

#[allow(unused)]
impl TestDb {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("test_db.db");

        let setup = Self { _dir: dir, path };
        setup.connect()?.apply_sql(&format!("DROP TABLE IF EXISTS {0}; CREATE TABLE {0} (number INTEGER, string TEXT);", TEST_TABLE))?;
        Ok(setup)
    }

    pub fn path(&self) -> PathBuf { self.path.clone() }

    pub fn connect(&self) -> Result<Connection> { self.connect_with(ConnectionConfig::default()) }

    pub fn connect_with(&self, config: ConnectionConfig) -> Result<Connection> {
        let mut conn = Connection::with_config(self.path(), config);
        conn.try_open()?;
        Ok(conn)
    }

    pub fn connections(&self, count: usize) -> Result<Vec<Connection>> { (0..count).map(|_| self.connect()).collect() }
}

#[allow(unused)]
pub fn row(values: &[&str]) -> Row { values.iter().map(|v| Some(v.to_string())).collect() }

/// Seed `(0, "zero")` through `(9, "nine")` with one bulk insert
#[allow(unused)]
pub fn fill_table(conn: &Connection) -> Result<()> {
    let names = ["zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine"];
    let rows: Vec<Row> = names.iter().enumerate().map(|(i, name)| row(&[&i.to_string(), *name])).collect();
    let keys = conn.insert_rows(TEST_TABLE, &rows)?;
    assert_eq!(keys.len(), 10);
    Ok(())
}

/// Run `work` directly on the connection, or inside a transaction that is committed afterwards
#[allow(unused)]
pub fn scoped<T>(conn: &Connection, transaction: bool, work: impl FnOnce(&dyn TableOps) -> Result<T>) -> Result<T> {
    if transaction {
        let tx = conn.begin_transaction(true)?;
        let result = work(&tx)?;
        tx.commit()?;
        Ok(result)
    } else {
        work(conn)
    }
}

fn random_number() -> u32 { rand::random::<u32>() >> 1 }

/// A workload run by one thread: `(connection, thread_id, count, transaction)`
#[allow(unused)]
pub type Workload = fn(&Connection, usize, usize, bool) -> Result<()>;

#[allow(unused)]
#[derive(Clone, Copy)]
pub struct Job {
    work: Workload,
    connection: usize,
    count: usize,
    transaction: bool,
}

#[allow(unused)]
impl Job {
    pub fn new(work: Workload, connection: usize, count: usize) -> Self { Self { work, connection, count, transaction: false } }

    pub fn transactional(self) -> Self { Self { transaction: true, ..self } }
}

/// Run every job on its own thread; the job's index is its thread id
#[allow(unused)]
pub fn run_parallel(connections: &[Connection], jobs: &[Job]) -> Result<()> {
    std::thread::scope(|s| {
        let handles: Vec<_> = jobs
            .iter()
            .enumerate()
            .map(|(thread_id, job)| {
                let conn = &connections[job.connection];
                s.spawn(move || (job.work)(conn, thread_id, job.count, job.transaction))
            })
            .collect();
        handles.into_iter().try_for_each(|handle| handle.join().expect("worker thread panicked"))
    })
}

#[allow(unused)]
pub fn selects(conn: &Connection, _thread_id: usize, count: usize, transaction: bool) -> Result<()> {
    for _ in 0..count / 3 {
        scoped(conn, transaction, |ops| {
            let rows = ops.select(TEST_TABLE, &key_values! { "number" => 3 })?;
            assert_eq!(rows[0], row(&["3", "three"]));

            let rows = ops.select_column(TEST_TABLE, "string", &key_values! { "number" => 9 })?;
            assert_eq!(rows[0][0].as_deref(), Some("nine"));

            let rows = ops.select_column(TEST_TABLE, "number", &key_values! { "number" => 10 })?;
            assert!(rows.is_empty());
            Ok(())
        })?;
    }
    Ok(())
}

/// Thread 0 owns the "zero" row and every other thread the "one" row; all threads fight over "two"
#[allow(unused)]
pub fn updates_and_selects(conn: &Connection, thread_id: usize, count: usize, transaction: bool) -> Result<()> {
    let thread_specific = if thread_id == 0 { "zero" } else { "one" };
    for _ in 0..count / 2 {
        scoped(conn, transaction, |ops| {
            let (number1, number2) = (random_number(), random_number());

            ops.update(TEST_TABLE, &key_values! { "number" => number1 }, &key_values! { "string" => thread_specific })?;
            let own = ops.select_column(TEST_TABLE, "number", &key_values! { "string" => thread_specific })?;

            ops.update(TEST_TABLE, &key_values! { "number" => number2 }, &key_values! { "string" => "two" })?;
            let shared = ops.select_column(TEST_TABLE, "number", &key_values! { "string" => "two" })?;

            assert!(!own.is_empty());
            assert_eq!(own[0][0], Some(number1.to_string()));
            assert_eq!(shared.len(), 1);
            Ok(())
        })?;
    }
    Ok(())
}

/// Insert a row, then replace it by rowid with a different string
#[allow(unused)]
pub fn inserts_or_replaces(conn: &Connection, _thread_id: usize, count: usize, transaction: bool) -> Result<()> {
    for _ in 0..count {
        scoped(conn, transaction, |ops| {
            let number = random_number();
            let keys = ops.insert_or_replace_rows(TEST_TABLE, &[row(&[&number.to_string(), &format!("randomNumber{}", number)])])?;

            let replacement = format!("randomNumber{}", number + 1);
            let key = ops.insert_or_replace(TEST_TABLE, &key_values! { "rowid" => keys[0], "number" => number, "string" => &replacement })?;
            assert_eq!(key, keys[0]);

            let rows = ops.select_column(TEST_TABLE, "string", &key_values! { "number" => number })?;
            assert_eq!(rows[0][0], Some(replacement));
            Ok(())
        })?;
    }
    Ok(())
}

/// Two rows per iteration: one positional, one from key/values
#[allow(unused)]
pub fn inserts(conn: &Connection, _thread_id: usize, count: usize, transaction: bool) -> Result<()> {
    for _ in 0..count / 2 {
        scoped(conn, transaction, |ops| {
            let (number1, number2) = (random_number(), random_number());
            ops.insert_rows(TEST_TABLE, &[row(&[&number1.to_string(), &format!("randomNumber{}", number1)])])?;
            ops.insert(TEST_TABLE, &key_values! { "number" => number2, "string" => format!("randomNumber{}", number2) })?;
            Ok(())
        })?;
    }
    Ok(())
}

#[allow(unused)]
pub fn inserts_and_selects(conn: &Connection, _thread_id: usize, count: usize, transaction: bool) -> Result<()> {
    for _ in 0..count {
        scoped(conn, transaction, |ops| {
            let number = random_number();
            ops.insert_rows(TEST_TABLE, &[row(&[&number.to_string(), &format!("randomNumber{}", number)])])?;

            let rows = ops.select(TEST_TABLE, &key_values! { "number" => number })?;
            assert_eq!(rows[0][1], Some(format!("randomNumber{}", rows[0][0].as_deref().unwrap_or_default())));
            Ok(())
        })?;
    }
    Ok(())
}

#[allow(unused)]
pub fn inserts_and_deletes(conn: &Connection, _thread_id: usize, count: usize, transaction: bool) -> Result<()> {
    for _ in 0..count {
        scoped(conn, transaction, |ops| {
            let number = random_number();
            ops.insert_rows(TEST_TABLE, &[row(&[&number.to_string(), &format!("randomNumber{}", number)])])?;
            assert_eq!(ops.delete_rows(TEST_TABLE, &key_values! { "number" => number })?, 1);
            Ok(())
        })?;
    }
    Ok(())
}
