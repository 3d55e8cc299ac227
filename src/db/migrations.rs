use anyhow::Context;
use rusqlite::{Connection, TransactionBehavior};

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_appointments.sql",
        include_str!("../../migrations/001_appointments.sql"),
    ),
    (
        "002_payments.sql",
        include_str!("../../migrations/002_payments.sql"),
    ),
    (
        "003_availability_and_queue.sql",
        include_str!("../../migrations/003_availability_and_queue.sql"),
    ),
];

pub fn run_migrations(conn: &mut Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .context("failed to create migrations table")?;

    for (name, sql) in MIGRATIONS {
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .with_context(|| format!("failed to start migration: {name}"))?;

        let already_applied: bool = tx
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .context("failed to check migration status")?;

        if already_applied {
            continue;
        }

        tx.execute_batch(sql)
            .with_context(|| format!("failed to apply migration: {name}"))?;

        tx.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])
            .with_context(|| format!("failed to record migration: {name}"))?;

        tx.commit()
            .with_context(|| format!("failed to commit migration: {name}"))?;

        tracing::info!("applied migration: {name}");
    }

    Ok(())
}
