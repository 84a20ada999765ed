//! Authoritative document collections used by the sync backend

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for LIMIT

use crate::error::Result;
use crate::models::SyncConflict;
use crate::util::now_millis;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

/// Trait for document storage operations (find/insert/replace by id)
pub trait DocumentStore {
    /// Find a document by collection and id
    fn find(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Insert a new document
    fn insert(&self, collection: &str, id: &str, body: &Value) -> Result<()>;

    /// Replace an existing document. Returns `false` if it did not exist.
    fn replace(&self, collection: &str, id: &str, body: &Value) -> Result<bool>;

    /// Remove a document. Returns `false` if it did not exist.
    fn remove(&self, collection: &str, id: &str) -> Result<bool>;

    /// All documents of a collection, in insertion order
    fn list(&self, collection: &str) -> Result<Vec<Value>>;

    /// Record a discarded incoming write
    fn record_conflict(&self, conflict: &SyncConflict) -> Result<()>;

    /// Most recently resolved conflicts first
    fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>>;
}

/// `SQLite` implementation of `DocumentStore`
pub struct SqliteDocumentStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteDocumentStore<'a> {
    /// Create a new store over the given connection (or transaction)
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_conflict(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncConflict> {
        Ok(SyncConflict {
            id: row.get(0)?,
            collection: row.get(1)?,
            record_id: row.get(2)?,
            remote_last_modified: row.get(3)?,
            incoming_last_modified: row.get(4)?,
            remote_version: u64::try_from(row.get::<_, i64>(5)?).unwrap_or_default(),
            incoming_version: u64::try_from(row.get::<_, i64>(6)?).unwrap_or_default(),
            resolved_at: row.get(7)?,
            strategy: row.get(8)?,
        })
    }
}

fn version_to_sql(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

impl DocumentStore for SqliteDocumentStore<'_> {
    fn find(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ? AND id = ?",
                params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        body.map(|body| serde_json::from_str(&body).map_err(Into::into))
            .transpose()
    }

    fn insert(&self, collection: &str, id: &str, body: &Value) -> Result<()> {
        self.conn.execute(
            "INSERT INTO documents (collection, id, body, updated_at) VALUES (?, ?, ?, ?)",
            params![collection, id, serde_json::to_string(body)?, now_millis()],
        )?;
        Ok(())
    }

    fn replace(&self, collection: &str, id: &str, body: &Value) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE documents SET body = ?, updated_at = ? WHERE collection = ? AND id = ?",
            params![serde_json::to_string(body)?, now_millis(), collection, id],
        )?;
        Ok(rows > 0)
    }

    fn remove(&self, collection: &str, id: &str) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM documents WHERE collection = ? AND id = ?",
            params![collection, id],
        )?;
        Ok(rows > 0)
    }

    fn list(&self, collection: &str) -> Result<Vec<Value>> {
        let mut stmt = self
            .conn
            .prepare("SELECT body FROM documents WHERE collection = ? ORDER BY rowid")?;

        let bodies = stmt
            .query_map(params![collection], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        bodies
            .iter()
            .map(|body| serde_json::from_str(body).map_err(Into::into))
            .collect()
    }

    fn record_conflict(&self, conflict: &SyncConflict) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sync_conflicts (
                collection,
                record_id,
                remote_last_modified,
                incoming_last_modified,
                remote_version,
                incoming_version,
                resolved_at,
                strategy
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                conflict.collection,
                conflict.record_id,
                conflict.remote_last_modified,
                conflict.incoming_last_modified,
                version_to_sql(conflict.remote_version),
                version_to_sql(conflict.incoming_version),
                conflict.resolved_at,
                conflict.strategy,
            ],
        )?;
        Ok(())
    }

    fn list_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, collection, record_id, remote_last_modified, incoming_last_modified,
                    remote_version, incoming_version, resolved_at, strategy
             FROM sync_conflicts
             ORDER BY resolved_at DESC, id DESC
             LIMIT ?",
        )?;

        let conflicts = stmt
            .query_map(params![limit as i64], Self::parse_conflict)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(conflicts)
    }
}
