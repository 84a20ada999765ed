//! Server-side merge engine
//!
//! Applies one sync request against the authoritative document store and
//! assembles the full collections returned to the client. Every entity type
//! goes through a deletion phase followed by an upsert phase; the whole
//! request runs inside one `SQLite` transaction.

use std::cmp::Ordering;

use rusqlite::Connection;
use serde_json::Value;

use crate::db::{DocumentStore, SqliteDocumentStore};
use crate::error::{Error, Result};
use crate::models::{
    Branch, Cashier, Customer, Entity, EntityKind, Owner, Product, Sale, Supplier, SyncConflict,
};
use crate::sync::protocol::{DeletionAck, SyncCollection, SyncRequest, SyncResponse};
use crate::util::now_millis;

/// Collection holding the single owner/admin document
pub const OWNER_COLLECTION: &str = "owners";

/// Conflict strategy recorded for every discarded write
pub const LWW_STRATEGY: &str = "lww";

/// Last-write-wins decision between the stored record and an incoming one.
///
/// The logical version decides first. On equal versions the incoming record
/// wins only with a strictly greater `lastModified`, so the stored record
/// wins ties.
///
/// A record with more edits behind it wins even when its clock reading is
/// older: an incoming `lastModified` of `T + 1` against a stored `T` is still
/// discarded if the incoming version is lower.
pub fn incoming_wins<T: Entity>(remote: &T, incoming: &T) -> bool {
    match incoming.version().cmp(&remote.version()) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => incoming.last_modified() > remote.last_modified(),
    }
}

/// Outcome of merging one entity type's batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Tombstones that removed a stored record
    pub deleted: usize,
    /// Incoming records stored for the first time
    pub inserted: usize,
    /// Incoming records that overwrote a stored one
    pub updated: usize,
    /// Incoming records identical to the stored one
    pub unchanged: usize,
    /// Incoming records discarded by last-write-wins
    pub conflicts: Vec<SyncConflict>,
    /// Every tombstone id processed, present or not
    pub acknowledged: Vec<String>,
}

/// Per-entity-type reports for one sync request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub reports: Vec<(EntityKind, MergeReport)>,
}

impl MergeSummary {
    /// Report for one entity type
    pub fn report(&self, kind: EntityKind) -> Option<&MergeReport> {
        self.reports
            .iter()
            .find(|(reported, _)| *reported == kind)
            .map(|(_, report)| report)
    }

    /// Total discarded writes across all entity types
    pub fn conflict_count(&self) -> usize {
        self.reports
            .iter()
            .map(|(_, report)| report.conflicts.len())
            .sum()
    }

    /// Total stored records written (inserted or updated)
    pub fn written_count(&self) -> usize {
        self.reports
            .iter()
            .map(|(_, report)| report.inserted + report.updated)
            .sum()
    }

    /// Total tombstones that removed a stored record
    pub fn deleted_count(&self) -> usize {
        self.reports.iter().map(|(_, report)| report.deleted).sum()
    }
}

/// Merge one entity type's tombstones and records into the store.
///
/// Tombstones are applied before records, so an id both deleted and
/// upserted in the same batch ends up re-inserted.
pub fn merge_collection<T: Entity>(
    store: &dyn DocumentStore,
    deleted_ids: &[String],
    incoming: &[T],
) -> Result<MergeReport> {
    let collection = T::KIND.collection();
    let mut report = MergeReport::default();

    for id in deleted_ids {
        if store.remove(collection, id)? {
            report.deleted += 1;
        }
        if !report.acknowledged.contains(id) {
            report.acknowledged.push(id.clone());
        }
    }

    for record in incoming {
        if record.id().trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "{} record without an id",
                T::KIND
            )));
        }

        let body = serde_json::to_value(record)?;
        let Some(stored) = store.find(collection, record.id())? else {
            store.insert(collection, record.id(), &body)?;
            report.inserted += 1;
            continue;
        };

        let remote: T = serde_json::from_value(stored)?;
        if remote == *record {
            report.unchanged += 1;
        } else if incoming_wins(&remote, record) {
            store.replace(collection, record.id(), &body)?;
            report.updated += 1;
        } else {
            tracing::debug!(
                entity = T::KIND.name(),
                id = record.id(),
                remote_version = remote.version(),
                incoming_version = record.version(),
                "Discarded stale incoming write"
            );
            report.conflicts.push(SyncConflict {
                id: 0,
                collection: collection.to_string(),
                record_id: record.id().to_string(),
                remote_last_modified: remote.last_modified(),
                incoming_last_modified: record.last_modified(),
                remote_version: remote.version(),
                incoming_version: record.version(),
                resolved_at: now_millis(),
                strategy: LWW_STRATEGY.to_string(),
            });
        }
    }

    Ok(report)
}

/// Every stored record of one entity type, in insertion order
pub fn load_collection<T: Entity>(store: &dyn DocumentStore) -> Result<Vec<T>> {
    store
        .list(T::KIND.collection())?
        .into_iter()
        .map(decode)
        .collect()
}

/// Stored records of one entity type matching a search filter
pub fn search<T: Entity>(store: &dyn DocumentStore, filter: &T::Search) -> Result<Vec<T>> {
    let mut records: Vec<T> = load_collection::<T>(store)?
        .into_iter()
        .filter(|record| record.matches(filter))
        .collect();
    T::sort_search_results(&mut records);
    Ok(records)
}

/// The owner/admin document, if one has been provisioned
pub fn find_owner(store: &dyn DocumentStore) -> Result<Option<Owner>> {
    let Some(body) = store.list(OWNER_COLLECTION)?.into_iter().next() else {
        return Ok(None);
    };
    Ok(Some(serde_json::from_value(body)?))
}

/// Store `owner` unless an owner already exists. Returns the owner in effect.
pub fn ensure_owner(store: &dyn DocumentStore, owner: &Owner) -> Result<Owner> {
    if let Some(existing) = find_owner(store)? {
        return Ok(existing);
    }
    if owner.id.trim().is_empty() {
        return Err(Error::InvalidInput("owner id must not be empty".to_string()));
    }
    store.insert(OWNER_COLLECTION, &owner.id, &serde_json::to_value(owner)?)?;
    tracing::info!(owner_id = %owner.id, "Provisioned owner account");
    Ok(owner.clone())
}

/// Applies complete sync requests atomically
pub struct MergeEngine;

impl MergeEngine {
    /// Merge every entity type of `request` and return the authoritative
    /// collections. Nothing is committed unless every step succeeds.
    pub fn apply(
        conn: &mut Connection,
        request: &SyncRequest,
    ) -> Result<(SyncResponse, MergeSummary)> {
        let tx = conn.transaction()?;
        let outcome = {
            let store = SqliteDocumentStore::new(&tx);
            Self::apply_to(&store, request)?
        };
        tx.commit()?;
        Ok(outcome)
    }

    /// Merge against an arbitrary store without managing a transaction
    pub fn apply_to(
        store: &dyn DocumentStore,
        request: &SyncRequest,
    ) -> Result<(SyncResponse, MergeSummary)> {
        let mut summary = MergeSummary::default();
        let mut ack = DeletionAck::default();

        merge_into::<Product>(store, request, &mut ack, &mut summary)?;
        merge_into::<Branch>(store, request, &mut ack, &mut summary)?;
        merge_into::<Cashier>(store, request, &mut ack, &mut summary)?;
        merge_into::<Supplier>(store, request, &mut ack, &mut summary)?;
        merge_into::<Sale>(store, request, &mut ack, &mut summary)?;
        merge_into::<Customer>(store, request, &mut ack, &mut summary)?;

        for (_, report) in &summary.reports {
            for conflict in &report.conflicts {
                store.record_conflict(conflict)?;
            }
        }

        let mut response = SyncResponse {
            acknowledged_deletions: Some(ack),
            conflicts: summary.conflict_count(),
            ..SyncResponse::default()
        };
        assemble::<Product>(store, &mut response)?;
        assemble::<Branch>(store, &mut response)?;
        assemble::<Cashier>(store, &mut response)?;
        assemble::<Supplier>(store, &mut response)?;
        assemble::<Sale>(store, &mut response)?;
        assemble::<Customer>(store, &mut response)?;

        Ok((response, summary))
    }
}

fn merge_into<T: SyncCollection>(
    store: &dyn DocumentStore,
    request: &SyncRequest,
    ack: &mut DeletionAck,
    summary: &mut MergeSummary,
) -> Result<()> {
    let (records, deleted_ids) = T::pushed(request);
    let report = merge_collection::<T>(store, deleted_ids, records)?;
    T::set_acknowledged(ack, report.acknowledged.clone());
    summary.reports.push((T::KIND, report));
    Ok(())
}

fn assemble<T: SyncCollection>(store: &dyn DocumentStore, response: &mut SyncResponse) -> Result<()> {
    T::set_authoritative(response, load_collection::<T>(store)?);
    Ok(())
}

/// Decode a stored document into a typed record
pub fn decode<T: Entity>(body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(Into::into)
}
