//! Database migrations

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension};

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);

    Ok(version)
}

/// Run a migration's statements atomically
fn apply(conn: &Connection, statements: &str) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(statements)?;
    tx.commit()?;
    Ok(())
}

/// Migration to version 1: client key-value namespaces
fn migrate_v1(conn: &Connection) -> Result<()> {
    apply(
        conn,
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );
        CREATE TABLE IF NOT EXISTS kv_store (
            namespace TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
        INSERT INTO schema_version (version) VALUES (1);",
    )?;

    tracing::info!("Migrated database to version 1");
    Ok(())
}

/// Migration to version 2: authoritative document collections and LWW conflict log
fn migrate_v2(conn: &Connection) -> Result<()> {
    apply(
        conn,
        "CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            body TEXT NOT NULL,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (collection, id)
        );
        CREATE TABLE IF NOT EXISTS sync_conflicts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            collection TEXT NOT NULL,
            record_id TEXT NOT NULL,
            remote_last_modified INTEGER NOT NULL,
            incoming_last_modified INTEGER NOT NULL,
            remote_version INTEGER NOT NULL,
            incoming_version INTEGER NOT NULL,
            resolved_at INTEGER NOT NULL,
            strategy TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sync_conflicts_record ON sync_conflicts(collection, record_id);
        CREATE INDEX IF NOT EXISTS idx_sync_conflicts_resolved_at ON sync_conflicts(resolved_at DESC);
        INSERT INTO schema_version (version) VALUES (2);",
    )?;

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
