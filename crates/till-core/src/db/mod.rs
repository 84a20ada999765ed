//! Database layer for Till
//!
//! One SQLite file backs both halves of the protocol: the client keeps its
//! namespaced key-value collections in `kv_store`, the sync backend keeps its
//! authoritative documents in `documents`.

mod connection;
mod documents;
mod kv;
mod migrations;

pub use connection::Database;
pub use documents::{DocumentStore, SqliteDocumentStore};
pub use kv::{KeyValueStore, SqliteKeyValueStore};
