//! One full-collection sync round trip
//!
//! Snapshot every local collection, push it, and on a well-formed success
//! response replace the local collections with the authoritative ones. Any
//! failure before the apply step leaves local state exactly as it was.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::protocol::SyncResponse;
use super::{SyncClient, SyncResult};
use crate::services::LocalStoreService;
use crate::sync::SyncError;

/// What a completed sync cycle did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Live records pushed
    pub pushed_records: usize,
    /// Tombstones pushed
    pub pushed_deletions: usize,
    /// Authoritative records received
    pub received_records: usize,
    /// Tombstones the backend acknowledged
    pub acknowledged_deletions: usize,
    /// Pushed writes the backend discarded as stale
    pub conflicts: usize,
    /// Whether the cached owner record was refreshed
    pub owner_refreshed: bool,
}

#[derive(Clone)]
pub struct SyncReconciler {
    store: LocalStoreService,
    client: SyncClient,
    in_flight: Arc<AtomicBool>,
}

impl SyncReconciler {
    pub fn new(store: LocalStoreService, client: SyncClient) -> Self {
        Self {
            store,
            client,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub const fn client(&self) -> &SyncClient {
        &self.client
    }

    /// Whether a sync cycle is currently running
    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one sync cycle. Overlapping calls fail with `SyncError::InProgress`.
    pub async fn request_sync(&self) -> SyncResult<SyncReport> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(SyncError::InProgress)?;

        let request = self.store.snapshot_all().await;
        let pushed_deletions = request.tombstone_count();
        let pushed_records = request.len() - pushed_deletions;
        tracing::info!(
            records = pushed_records,
            deletions = pushed_deletions,
            endpoint = self.client.base_url(),
            "Starting sync"
        );

        let response = self.client.push(&request).await.inspect_err(|error| {
            tracing::warn!("Sync failed, keeping local changes for retry: {error}");
        })?;

        let mut report = SyncReport {
            pushed_records,
            pushed_deletions,
            received_records: received_records(&response),
            acknowledged_deletions: response
                .acknowledged_deletions
                .as_ref()
                .map_or(pushed_deletions, |ack| {
                    ack.products.len()
                        + ack.branches.len()
                        + ack.cashiers.len()
                        + ack.suppliers.len()
                        + ack.sales.len()
                        + ack.customers.len()
                }),
            conflicts: response.conflicts,
            owner_refreshed: false,
        };

        self.store.apply_authoritative_all(response, &request).await?;
        report.owner_refreshed = self.refresh_owner().await;

        tracing::info!(
            received = report.received_records,
            conflicts = report.conflicts,
            "Sync complete"
        );
        Ok(report)
    }

    async fn refresh_owner(&self) -> bool {
        let owner = match self.client.fetch_owner().await {
            Ok(owner) => owner,
            Err(error) => {
                tracing::warn!("Owner refresh skipped: {error}");
                return false;
            }
        };
        match self.store.cache_owner(&owner).await {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!("Failed to cache owner record: {error}");
                false
            }
        }
    }
}

fn received_records(response: &SyncResponse) -> usize {
    response.products.len()
        + response.branches.len()
        + response.cashiers.len()
        + response.suppliers.len()
        + response.sales.len()
        + response.customers.len()
}

/// Holds the in-flight flag for the lifetime of one sync cycle
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
