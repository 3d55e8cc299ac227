pub mod ledger;
pub mod migrations;
pub mod queries;

use std::time::Duration;

use anyhow::Context;
use rusqlite::Connection;

/// Opens the database, sets pragmas and brings the schema up to date.
/// `busy_timeout` bounds how long a writer waits on another writer's lock.
pub fn init_db(path: &str, busy_timeout: Duration) -> anyhow::Result<Connection> {
    let mut conn = Connection::open(path).context("failed to open database")?;

    conn.busy_timeout(busy_timeout)
        .context("failed to set busy timeout")?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .context("failed to set database pragmas")?;

    migrations::run_migrations(&mut conn)?;

    Ok(conn)
}
