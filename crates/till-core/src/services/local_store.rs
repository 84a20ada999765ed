//! Shared local store service wrapper used across clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{Database, KeyValueStore, SqliteKeyValueStore};
use crate::models::{
    Branch, Cashier, Customer, Entity, EntityKind, Owner, Product, Sale, Supplier,
};
use crate::mutation_log::LocalMutationLog;
use crate::sync::protocol::{SyncCollection, SyncRequest, SyncResponse};
use crate::Result;

/// Namespace caching the owner record fetched from the backend
pub const OWNER_NAMESPACE: &str = "owner_record";

/// Thread-safe service over the local key-value store.
#[derive(Clone)]
pub struct LocalStoreService {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl LocalStoreService {
    /// Open the local store at the given filesystem path.
    ///
    /// A file that is not a database is moved aside and replaced by an empty
    /// store; the backend still holds everything that was synced.
    pub fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = match Database::open(&db_path) {
            Ok(db) => db,
            Err(error) if Self::is_corrupted_db_error(&error) => {
                tracing::warn!(
                    "Local store at {} is unreadable: {}. Starting from an empty store.",
                    db_path.display(),
                    error
                );
                Self::quarantine_corrupted_db_files(&db_path)?;
                Database::open(&db_path)?
            }
            Err(error) => return Err(error),
        };

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory store (primarily for tests).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            db: Arc::new(Mutex::new(Database::open_in_memory()?)),
            db_path: None,
        })
    }

    /// Path of the backing file, if any.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn is_corrupted_db_error(error: &crate::Error) -> bool {
        let message = error.to_string().to_ascii_lowercase();
        message.contains("file is not a database") || message.contains("malformed")
    }

    fn quarantine_corrupted_db_files(db_path: &Path) -> Result<()> {
        if db_path.exists() {
            let timestamp = chrono::Utc::now().timestamp_millis();
            let backup_path = db_path.with_extension(format!("corrupt-{timestamp}"));
            std::fs::rename(db_path, &backup_path)?;
            tracing::warn!(
                "Moved corrupted local store from {} to {}",
                db_path.display(),
                backup_path.display()
            );
        }

        for suffix in ["-wal", "-shm"] {
            let mut sidecar = db_path.as_os_str().to_owned();
            sidecar.push(suffix);
            let sidecar = PathBuf::from(sidecar);
            if sidecar.exists() {
                std::fs::remove_file(&sidecar)?;
                tracing::warn!("Removed stale local store file {}", sidecar.display());
            }
        }

        Ok(())
    }

    /// List live records of one entity type.
    pub async fn list<T: Entity>(&self) -> Vec<T> {
        let db = self.db.lock().await;
        let kv = SqliteKeyValueStore::new(db.connection());
        LocalMutationLog::<T>::new(&kv).list()
    }

    /// Fetch a live record by id.
    pub async fn get<T: Entity>(&self, id: &str) -> Option<T> {
        let db = self.db.lock().await;
        let kv = SqliteKeyValueStore::new(db.connection());
        LocalMutationLog::<T>::new(&kv).get(id)
    }

    /// Create or replace a record.
    pub async fn upsert<T: Entity>(&self, record: T) -> Result<T> {
        let db = self.db.lock().await;
        let kv = SqliteKeyValueStore::new(db.connection());
        LocalMutationLog::<T>::new(&kv).upsert_local(record)
    }

    /// Delete a record and queue its id for deletion propagation.
    pub async fn delete<T: Entity>(&self, id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let kv = SqliteKeyValueStore::new(db.connection());
        LocalMutationLog::<T>::new(&kv).delete_local(id)
    }

    /// Tombstoned ids of one entity type awaiting sync.
    pub async fn tombstones<T: Entity>(&self) -> Vec<String> {
        let db = self.db.lock().await;
        let kv = SqliteKeyValueStore::new(db.connection());
        LocalMutationLog::<T>::new(&kv).tombstones()
    }

    /// Pending deletions of every entity type, in processing order.
    pub async fn pending_deletions(&self) -> Vec<(EntityKind, Vec<String>)> {
        let db = self.db.lock().await;
        let kv = SqliteKeyValueStore::new(db.connection());
        vec![
            (EntityKind::Product, LocalMutationLog::<Product>::new(&kv).tombstones()),
            (EntityKind::Branch, LocalMutationLog::<Branch>::new(&kv).tombstones()),
            (EntityKind::Cashier, LocalMutationLog::<Cashier>::new(&kv).tombstones()),
            (EntityKind::Supplier, LocalMutationLog::<Supplier>::new(&kv).tombstones()),
            (EntityKind::Sale, LocalMutationLog::<Sale>::new(&kv).tombstones()),
            (EntityKind::Customer, LocalMutationLog::<Customer>::new(&kv).tombstones()),
        ]
    }

    /// Snapshot every entity type into one sync request.
    pub async fn snapshot_all(&self) -> SyncRequest {
        let db = self.db.lock().await;
        let kv = SqliteKeyValueStore::new(db.connection());
        let mut request = SyncRequest::default();
        push::<Product>(&kv, &mut request);
        push::<Branch>(&kv, &mut request);
        push::<Cashier>(&kv, &mut request);
        push::<Supplier>(&kv, &mut request);
        push::<Sale>(&kv, &mut request);
        push::<Customer>(&kv, &mut request);
        request
    }

    /// Replace every local collection with the server's authoritative set and
    /// clear acknowledged tombstones, all in one transaction.
    ///
    /// Without an acknowledgement block, the tombstones carried by `pushed`
    /// count as acknowledged. Records written after `pushed` was taken are
    /// kept for the next sync.
    pub async fn apply_authoritative_all(
        &self,
        mut response: SyncResponse,
        pushed: &SyncRequest,
    ) -> Result<()> {
        let mut db = self.db.lock().await;
        let tx = db.connection_mut().transaction()?;
        {
            let kv = SqliteKeyValueStore::new(&tx);
            apply::<Product>(&kv, &mut response, pushed)?;
            apply::<Branch>(&kv, &mut response, pushed)?;
            apply::<Cashier>(&kv, &mut response, pushed)?;
            apply::<Supplier>(&kv, &mut response, pushed)?;
            apply::<Sale>(&kv, &mut response, pushed)?;
            apply::<Customer>(&kv, &mut response, pushed)?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Owner record cached by the last successful owner fetch.
    pub async fn cached_owner(&self) -> Option<Owner> {
        let db = self.db.lock().await;
        let kv = SqliteKeyValueStore::new(db.connection());
        let raw = match kv.get(OWNER_NAMESPACE) {
            Ok(raw) => raw?,
            Err(error) => {
                tracing::warn!("Local store read failed for {OWNER_NAMESPACE}: {error}");
                return None;
            }
        };
        serde_json::from_str(&raw)
            .inspect_err(|error| tracing::warn!("Corrupt cached owner record: {error}"))
            .ok()
    }

    /// Cache the owner record.
    pub async fn cache_owner(&self, owner: &Owner) -> Result<()> {
        let db = self.db.lock().await;
        let kv = SqliteKeyValueStore::new(db.connection());
        kv.set(OWNER_NAMESPACE, &serde_json::to_string(owner)?)
    }
}

fn push<T: SyncCollection>(kv: &dyn KeyValueStore, request: &mut SyncRequest) {
    T::push_snapshot(request, LocalMutationLog::<T>::new(kv).snapshot_for_sync());
}

fn apply<T: SyncCollection>(
    kv: &dyn KeyValueStore,
    response: &mut SyncResponse,
    pushed: &SyncRequest,
) -> Result<()> {
    let records = T::take_authoritative(response);
    let (pushed_records, pushed_deletions) = T::pushed(pushed);
    let acknowledged = response
        .acknowledged_deletions
        .as_ref()
        .map_or(pushed_deletions, T::acknowledged);
    LocalMutationLog::<T>::new(kv).apply_authoritative(records, acknowledged, pushed_records)
}
