//! Wire format of the sync endpoint and the narrow read-only endpoints
//!
//! Request and response carry one array per entity type. Request fields
//! default to empty when absent; response collections are mandatory so a
//! truncated or foreign payload is rejected as malformed instead of being
//! applied as "the server has nothing".

use serde::{Deserialize, Serialize};

use crate::models::{
    Branch, Cashier, Customer, Entity, Owner, Product, Sale, Supplier, SyncConflict,
};
use crate::mutation_log::SyncSnapshot;

/// Client → server: every live record plus every tombstone, per entity type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub branches: Vec<Branch>,
    #[serde(default)]
    pub cashiers: Vec<Cashier>,
    #[serde(default)]
    pub suppliers: Vec<Supplier>,
    #[serde(default)]
    pub sales: Vec<Sale>,
    #[serde(default)]
    pub customers: Vec<Customer>,
    #[serde(default)]
    pub deleted_product_ids: Vec<String>,
    #[serde(default)]
    pub deleted_branch_ids: Vec<String>,
    #[serde(default)]
    pub deleted_cashier_ids: Vec<String>,
    #[serde(default)]
    pub deleted_supplier_ids: Vec<String>,
    #[serde(default)]
    pub deleted_sale_ids: Vec<String>,
    #[serde(default)]
    pub deleted_customer_ids: Vec<String>,
}

impl SyncRequest {
    /// Total number of records and tombstones carried
    pub fn len(&self) -> usize {
        self.products.len()
            + self.branches.len()
            + self.cashiers.len()
            + self.suppliers.len()
            + self.sales.len()
            + self.customers.len()
            + self.tombstone_count()
    }

    /// Whether the request carries nothing at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of tombstoned ids carried
    pub fn tombstone_count(&self) -> usize {
        self.deleted_product_ids.len()
            + self.deleted_branch_ids.len()
            + self.deleted_cashier_ids.len()
            + self.deleted_supplier_ids.len()
            + self.deleted_sale_ids.len()
            + self.deleted_customer_ids.len()
    }
}

/// Deletion ids the server processed, per collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionAck {
    #[serde(default)]
    pub products: Vec<String>,
    #[serde(default)]
    pub branches: Vec<String>,
    #[serde(default)]
    pub cashiers: Vec<String>,
    #[serde(default)]
    pub suppliers: Vec<String>,
    #[serde(default)]
    pub sales: Vec<String>,
    #[serde(default)]
    pub customers: Vec<String>,
}

/// Server → client: the complete authoritative collection of every entity type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub products: Vec<Product>,
    pub branches: Vec<Branch>,
    pub cashiers: Vec<Cashier>,
    pub suppliers: Vec<Supplier>,
    pub sales: Vec<Sale>,
    pub customers: Vec<Customer>,
    /// Absent when talking to a backend that does not acknowledge deletions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_deletions: Option<DeletionAck>,
    /// Incoming writes discarded by last-write-wins
    #[serde(default)]
    pub conflicts: usize,
}

/// `GET /api/owner`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerResponse {
    pub owner: Owner,
}

/// `GET /api/sync/conflicts`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictsResponse {
    pub conflicts: Vec<SyncConflict>,
}

/// Error body returned by the backend on any non-success status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Typed access to one entity type's slots in the sync payloads
pub trait SyncCollection: Entity {
    /// Records and tombstones pushed for this entity type
    fn pushed(request: &SyncRequest) -> (&[Self], &[String]);

    /// Place a local snapshot into the outgoing request
    fn push_snapshot(request: &mut SyncRequest, snapshot: SyncSnapshot<Self>);

    /// Take the authoritative collection out of a response
    fn take_authoritative(response: &mut SyncResponse) -> Vec<Self>;

    /// Place the authoritative collection into a response
    fn set_authoritative(response: &mut SyncResponse, records: Vec<Self>);

    /// Deletion ids acknowledged for this entity type
    fn acknowledged(ack: &DeletionAck) -> &[String];

    /// Record the deletion ids processed for this entity type
    fn set_acknowledged(ack: &mut DeletionAck, ids: Vec<String>);
}

macro_rules! impl_sync_collection {
    ($entity:ty, $collection:ident, $deleted:ident) => {
        impl SyncCollection for $entity {
            fn pushed(request: &SyncRequest) -> (&[Self], &[String]) {
                (&request.$collection, &request.$deleted)
            }

            fn push_snapshot(request: &mut SyncRequest, snapshot: SyncSnapshot<Self>) {
                request.$collection = snapshot.records;
                request.$deleted = snapshot.tombstones;
            }

            fn take_authoritative(response: &mut SyncResponse) -> Vec<Self> {
                std::mem::take(&mut response.$collection)
            }

            fn set_authoritative(response: &mut SyncResponse, records: Vec<Self>) {
                response.$collection = records;
            }

            fn acknowledged(ack: &DeletionAck) -> &[String] {
                &ack.$collection
            }

            fn set_acknowledged(ack: &mut DeletionAck, ids: Vec<String>) {
                ack.$collection = ids;
            }
        }
    };
}

impl_sync_collection!(Product, products, deleted_product_ids);
impl_sync_collection!(Branch, branches, deleted_branch_ids);
impl_sync_collection!(Cashier, cashiers, deleted_cashier_ids);
impl_sync_collection!(Supplier, suppliers, deleted_supplier_ids);
impl_sync_collection!(Sale, sales, deleted_sale_ids);
impl_sync_collection!(Customer, customers, deleted_customer_ids);
