use rusqlite::Connection;

use crate::schema;

/// Run all pending migrations, each in its own transaction.
pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(schema::CREATE_SCHEMA_VERSION)?;

    let current = get_version(conn)?;

    if current < 1 {
        migrate_v1(conn)?;
    }
    if current < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn get_version(conn: &Connection) -> anyhow::Result<i64> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn set_version(conn: &Connection, version: i64) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO schema_version (version, applied_at) VALUES (?1, datetime('now'))",
        [version],
    )?;
    Ok(())
}

/// Migration v1: create all initial tables.
fn migrate_v1(conn: &Connection) -> anyhow::Result<()> {
    tracing::info!("applying migration v1: initial schema");
    let tx = conn.unchecked_transaction()?;
    for stmt in &schema::ALL_TABLES[1..] {
        tx.execute_batch(stmt)?;
    }
    set_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: lookup indexes for owner and collection scans.
fn migrate_v2(conn: &Connection) -> anyhow::Result<()> {
    tracing::info!("applying migration v2: owner and collection indexes");
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(schema::CREATE_INDEXES)?;
    set_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}
