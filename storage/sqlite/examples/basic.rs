//! Basic usage: one connection shared by a few writer threads, then a transaction

use std::sync::Arc;
use std::thread;

use sqlite_access::{key_values, Connection, ConnectionConfig, JournalMode, TableOps};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::DEBUG).init();

    let path = std::env::temp_dir().join("sqlite_access_basic.db");
    let mut conn = Connection::with_config(&path, ConnectionConfig::default().with_journal_mode(JournalMode::Wal));
    if !conn.open() {
        anyhow::bail!("could not open {}", path.display());
    }
    conn.apply_sql("DROP TABLE IF EXISTS readings; CREATE TABLE readings (sensor TEXT, value INTEGER);")?;

    let conn = Arc::new(conn);
    let writers: Vec<_> = (0..4)
        .map(|sensor| {
            let conn = conn.clone();
            thread::spawn(move || -> sqlite_access::Result<()> {
                for value in 0..25 {
                    conn.insert("readings", &key_values! { "sensor" => format!("sensor-{}", sensor), "value" => value })?;
                }
                Ok(())
            })
        })
        .collect();
    for writer in writers {
        writer.join().map_err(|_| anyhow::anyhow!("writer thread panicked"))??;
    }

    let tx = conn.begin_transaction(false)?;
    tx.delete_rows("readings", &key_values! { "sensor" => "sensor-0" })?;
    tx.update("readings", &key_values! { "value" => 0 }, &key_values! { "sensor" => "sensor-1" })?;
    tx.commit()?;

    println!("rows: {}", conn.count("readings", &[])?);
    println!("sum: {}", conn.sum("readings", "value", &[])?);
    println!("average for sensor-2: {}", conn.average("readings", "value", &key_values! { "sensor" => "sensor-2" })?);
    Ok(())
}
