//! Per-entity local mutation log
//!
//! Each entity type owns two namespaces in the local key-value store: the
//! ordered live collection (`<entity>_records`) and the set of ids deleted
//! since the last acknowledged sync (`<entity>_deleted_ids`). Deletions need
//! the tombstone set because a full-collection push cannot express "this
//! record no longer exists" by omission.
//!
//! Reads fail open: an unreadable or corrupt namespace behaves as empty.
//! Writes surface their errors.

use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::db::KeyValueStore;
use crate::error::{Error, Result};
use crate::models::Entity;
use crate::util::now_millis;

/// Point-in-time copy of one entity type's local state, handed to the reconciler
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSnapshot<T> {
    pub records: Vec<T>,
    pub tombstones: Vec<String>,
}

impl<T> Default for SyncSnapshot<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            tombstones: Vec::new(),
        }
    }
}

/// Local live collection plus tombstone set for one entity type
pub struct LocalMutationLog<'a, T: Entity> {
    store: &'a dyn KeyValueStore,
    _entity: PhantomData<T>,
}

impl<'a, T: Entity> LocalMutationLog<'a, T> {
    /// Create a log over the given key-value store
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    /// Live records, in the order they were first created
    pub fn list(&self) -> Vec<T> {
        self.read_namespace(&T::KIND.records_namespace())
    }

    /// Tombstoned ids awaiting an acknowledged sync
    pub fn tombstones(&self) -> Vec<String> {
        self.read_namespace(&T::KIND.tombstones_namespace())
    }

    /// Look up a live record by id
    pub fn get(&self, id: &str) -> Option<T> {
        self.list().into_iter().find(|record| record.id() == id)
    }

    /// Insert a record, or replace the record with the same id.
    ///
    /// Stamps `lastModified` with the current time (never less than the
    /// previous stamp + 1) and advances the logical version.
    pub fn upsert_local(&self, mut record: T) -> Result<T> {
        if record.id().trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "{} id must not be empty",
                T::KIND
            )));
        }

        let mut records = self.list();
        let now = now_millis();
        match records.iter_mut().find(|existing| existing.id() == record.id()) {
            Some(existing) => {
                let last_modified = now.max(existing.last_modified().saturating_add(1));
                let version = existing.version().max(record.version()).saturating_add(1);
                record.set_stamp(last_modified, version);
                *existing = record.clone();
            }
            None => {
                let version = record.version().saturating_add(1);
                record.set_stamp(now, version);
                records.push(record.clone());
            }
        }

        self.write_namespace(&T::KIND.records_namespace(), &records)?;
        tracing::debug!(entity = T::KIND.name(), id = record.id(), "Upserted local record");
        Ok(record)
    }

    /// Remove a record and remember its id for deletion propagation.
    ///
    /// Returns `false` without side effects when the id is not live.
    pub fn delete_local(&self, id: &str) -> Result<bool> {
        let mut records = self.list();
        let before = records.len();
        records.retain(|record| record.id() != id);
        if records.len() == before {
            return Ok(false);
        }

        let mut tombstones = self.tombstones();
        if !tombstones.iter().any(|existing| existing == id) {
            tombstones.push(id.to_string());
        }

        self.write_namespace(&T::KIND.records_namespace(), &records)?;
        self.write_namespace(&T::KIND.tombstones_namespace(), &tombstones)?;
        tracing::debug!(entity = T::KIND.name(), id, "Deleted local record");
        Ok(true)
    }

    /// Read-only copy of the live collection and tombstones
    pub fn snapshot_for_sync(&self) -> SyncSnapshot<T> {
        SyncSnapshot {
            records: self.list(),
            tombstones: self.tombstones(),
        }
    }

    /// Replace the live collection with the server's authoritative one and
    /// drop the tombstones the server acknowledged.
    ///
    /// `pushed` is the snapshot the server answered. Local writes made after
    /// it was taken win over the server copy until the next sync: a record
    /// absent from `pushed`, or with a higher version than its pushed copy,
    /// is kept. Tombstones added after the snapshot survive too, and records
    /// they name are kept out of the live collection.
    pub fn apply_authoritative(
        &self,
        records: Vec<T>,
        acknowledged: &[String],
        pushed: &[T],
    ) -> Result<()> {
        let acknowledged: HashSet<&str> = acknowledged.iter().map(String::as_str).collect();
        let remaining: Vec<String> = self
            .tombstones()
            .into_iter()
            .filter(|id| !acknowledged.contains(id.as_str()))
            .collect();

        let pushed_versions: HashMap<&str, u64> = pushed
            .iter()
            .map(|record| (record.id(), record.version()))
            .collect();
        let late_writes: Vec<T> = self
            .list()
            .into_iter()
            .filter(|record| {
                pushed_versions
                    .get(record.id())
                    .is_none_or(|pushed_version| record.version() > *pushed_version)
            })
            .collect();

        let pending: HashSet<&str> = remaining.iter().map(String::as_str).collect();
        let mut records: Vec<T> = records
            .into_iter()
            .filter(|record| !pending.contains(record.id()))
            .collect();
        for local in &late_writes {
            match records.iter_mut().find(|record| record.id() == local.id()) {
                Some(existing) => *existing = local.clone(),
                None => records.push(local.clone()),
            }
        }

        self.write_namespace(&T::KIND.records_namespace(), &records)?;
        if remaining.is_empty() {
            self.store.remove(&T::KIND.tombstones_namespace())?;
        } else {
            self.write_namespace(&T::KIND.tombstones_namespace(), &remaining)?;
        }

        tracing::debug!(
            entity = T::KIND.name(),
            records = records.len(),
            late_writes = late_writes.len(),
            pending_tombstones = remaining.len(),
            "Applied authoritative snapshot"
        );
        Ok(())
    }

    fn read_namespace<V: DeserializeOwned>(&self, namespace: &str) -> Vec<V> {
        let raw = match self.store.get(namespace) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(error) => {
                tracing::warn!("Local store read failed for {namespace}: {error}; treating as empty");
                return Vec::new();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|error| {
            tracing::warn!("Corrupt local namespace {namespace}: {error}; treating as empty");
            Vec::new()
        })
    }

    fn write_namespace<V: Serialize>(&self, namespace: &str, values: &[V]) -> Result<()> {
        let raw = serde_json::to_string(values)?;
        self.store.set(namespace, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Database, SqliteKeyValueStore};
    use crate::models::{Branch, Product};
    use pretty_assertions::assert_eq;

    fn product(id: &str, name: &str) -> Product {
        Product {
            id: id.to_string(),
            ..Product::new(name, 100.0)
        }
    }

    #[test]
    fn test_upsert_inserts_then_replaces() {
        let db = Database::open_in_memory().unwrap();
        let store = SqliteKeyValueStore::new(db.connection());
        let log = LocalMutationLog::<Product>::new(&store);

        let created = log.upsert_local(product("p1", "Rice")).unwrap();
        assert_eq!(created.version, 1);
        assert!(created.last_modified > 0);

        let mut edited = created.clone();
        edited.price = 120.0;
        let updated = log.upsert_local(edited).unwrap();

        assert!(updated.last_modified > created.last_modified);
        assert_eq!(updated.version, 2);

        let records = log.list();
        assert_eq!(records.len(), 1);
        assert!((records[0].price - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_last_modified_strictly_increases_even_when_clock_is_behind() {
        let db = Database::open_in_memory().unwrap();
        let store = SqliteKeyValueStore::new(db.connection());
        let log = LocalMutationLog::<Product>::new(&store);

        let far_future = now_millis() + 60_000;
        let mut seeded = product("p1", "Rice");
        seeded.last_modified = far_future;
        store
            .set("product_records", &serde_json::to_string(&[seeded.clone()]).unwrap())
            .unwrap();

        let updated = log.upsert_local(seeded).unwrap();
        assert_eq!(updated.last_modified, far_future + 1);
    }

    #[test]
    fn test_upsert_rejects_empty_id() {
        let db = Database::open_in_memory().unwrap();
        let store = SqliteKeyValueStore::new(db.connection());
        let log = LocalMutationLog::<Product>::new(&store);

        let error = log.upsert_local(product("  ", "Rice")).unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
    }

    #[test]
    fn test_upsert_preserves_creation_order() {
        let db = Database::open_in_memory().unwrap();
        let store = SqliteKeyValueStore::new(db.connection());
        let log = LocalMutationLog::<Product>::new(&store);

        log.upsert_local(product("a", "A")).unwrap();
        log.upsert_local(product("b", "B")).unwrap();
        log.upsert_local(product("a", "A2")).unwrap();

        let ids: Vec<_> = log.list().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_delete_records_tombstone_once() {
        let db = Database::open_in_memory().unwrap();
        let store = SqliteKeyValueStore::new(db.connection());
        let log = LocalMutationLog::<Product>::new(&store);

        log.upsert_local(product("p1", "Rice")).unwrap();
        assert!(log.delete_local("p1").unwrap());
        assert!(!log.delete_local("p1").unwrap());

        assert!(log.list().is_empty());
        assert_eq!(log.tombstones(), vec!["p1".to_string()]);
    }

    #[test]
    fn test_delete_unknown_id_has_no_side_effect() {
        let db = Database::open_in_memory().unwrap();
        let store = SqliteKeyValueStore::new(db.connection());
        let log = LocalMutationLog::<Product>::new(&store);

        assert!(!log.delete_local("ghost").unwrap());
        assert!(log.tombstones().is_empty());
        assert_eq!(store.get("product_deleted_ids").unwrap(), None);
    }

    #[test]
    fn test_corrupt_namespace_reads_as_empty() {
        let db = Database::open_in_memory().unwrap();
        let store = SqliteKeyValueStore::new(db.connection());
        store.set("product_records", "{not json").unwrap();
        store.set("product_deleted_ids", "42").unwrap();

        let log = LocalMutationLog::<Product>::new(&store);
        assert!(log.list().is_empty());
        assert!(log.tombstones().is_empty());

        // Writing over the corrupt value recovers the namespace
        log.upsert_local(product("p1", "Rice")).unwrap();
        assert_eq!(log.list().len(), 1);
    }

    #[test]
    fn test_snapshot_contains_records_and_tombstones() {
        let db = Database::open_in_memory().unwrap();
        let store = SqliteKeyValueStore::new(db.connection());
        let log = LocalMutationLog::<Branch>::new(&store);

        let kept = log.upsert_local(Branch::new("CBD", "Nairobi")).unwrap();
        let gone = log.upsert_local(Branch::new("Old", "Mombasa")).unwrap();
        log.delete_local(&gone.id).unwrap();

        let snapshot = log.snapshot_for_sync();
        assert_eq!(snapshot.records, vec![kept]);
        assert_eq!(snapshot.tombstones, vec![gone.id]);
    }

    #[test]
    fn test_apply_authoritative_replaces_and_clears_acknowledged() {
        let db = Database::open_in_memory().unwrap();
        let store = SqliteKeyValueStore::new(db.connection());
        let log = LocalMutationLog::<Product>::new(&store);

        log.upsert_local(product("local-only", "Beans")).unwrap();
        log.upsert_local(product("p1", "Rice")).unwrap();
        log.delete_local("p1").unwrap();
        let snapshot = log.snapshot_for_sync();

        let server = vec![product("p2", "Sugar")];
        log.apply_authoritative(server.clone(), &["p1".to_string()], &snapshot.records)
            .unwrap();

        assert_eq!(log.list(), server);
        assert!(log.tombstones().is_empty());
        assert_eq!(store.get("product_deleted_ids").unwrap(), None);
    }

    #[test]
    fn test_apply_authoritative_keeps_unacknowledged_tombstones() {
        let db = Database::open_in_memory().unwrap();
        let store = SqliteKeyValueStore::new(db.connection());
        let log = LocalMutationLog::<Product>::new(&store);

        log.upsert_local(product("p1", "Rice")).unwrap();
        log.upsert_local(product("p2", "Sugar")).unwrap();
        log.delete_local("p1").unwrap();
        log.delete_local("p2").unwrap();

        // Server only processed p1; it still returns p2
        let server = vec![product("p2", "Sugar"), product("p3", "Salt")];
        log.apply_authoritative(server, &["p1".to_string()], &[])
            .unwrap();

        assert_eq!(log.tombstones(), vec!["p2".to_string()]);
        let ids: Vec<_> = log.list().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["p3"]);
    }

    #[test]
    fn test_apply_authoritative_keeps_writes_made_after_snapshot() {
        let db = Database::open_in_memory().unwrap();
        let store = SqliteKeyValueStore::new(db.connection());
        let log = LocalMutationLog::<Product>::new(&store);

        let edited = log.upsert_local(product("p1", "Rice")).unwrap();
        log.upsert_local(product("p2", "Beans")).unwrap();
        let snapshot = log.snapshot_for_sync();

        // While the push is in flight: one new record, one edit
        let created = log.upsert_local(product("p3", "Salt")).unwrap();
        let mut edit = edited.clone();
        edit.price = 130.0;
        let edit = log.upsert_local(edit).unwrap();

        let server = vec![edited, product("p2", "Beans")];
        log.apply_authoritative(server, &[], &snapshot.records)
            .unwrap();

        let records = log.list();
        let ids: Vec<_> = records.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
        assert_eq!(records[0], edit);
        assert_eq!(records[2], created);
    }
}
