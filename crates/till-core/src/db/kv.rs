//! Namespaced key-value store used for the client's local state

use crate::error::Result;
use crate::util::now_millis;
use rusqlite::{params, Connection, OptionalExtension};

/// Trait for local key-value storage operations
pub trait KeyValueStore {
    /// Read the raw value stored under a namespace
    fn get(&self, namespace: &str) -> Result<Option<String>>;

    /// Replace the value stored under a namespace
    fn set(&self, namespace: &str, value: &str) -> Result<()>;

    /// Remove a namespace entirely
    fn remove(&self, namespace: &str) -> Result<()>;
}

/// `SQLite` implementation of `KeyValueStore`
pub struct SqliteKeyValueStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteKeyValueStore<'a> {
    /// Create a new store over the given connection (or transaction)
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl KeyValueStore for SqliteKeyValueStore<'_> {
    fn get(&self, namespace: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE namespace = ?",
                params![namespace],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, namespace: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv_store (namespace, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(namespace) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![namespace, value, now_millis()],
        )?;
        Ok(())
    }

    fn remove(&self, namespace: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM kv_store WHERE namespace = ?",
            params![namespace],
        )?;
        Ok(())
    }
}
