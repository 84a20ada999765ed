//! Sync conflict model

use serde::{Deserialize, Serialize};

/// An incoming write discarded by last-write-wins reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConflict {
    /// Conflict row identifier
    pub id: i64,
    /// Collection name (`products`, `branches`, ...)
    pub collection: String,
    /// Record involved in the conflict
    pub record_id: String,
    /// Stored record's timestamp when the conflict occurred
    pub remote_last_modified: i64,
    /// Incoming record's timestamp that was rejected
    pub incoming_last_modified: i64,
    /// Stored record's logical version
    pub remote_version: u64,
    /// Incoming record's logical version
    pub incoming_version: u64,
    /// Resolution timestamp (unix ms)
    pub resolved_at: i64,
    /// Resolution strategy name
    pub strategy: String,
}
