//! Data models for Till
//!
//! Every synchronized record is a flat document keyed by a client-assigned
//! string `id`, carrying a `lastModified` epoch-millisecond timestamp and a
//! logical `version` counter used for last-write-wins reconciliation.

mod branch;
mod cashier;
mod customer;
mod owner;
mod product;
mod sale;
mod supplier;
mod sync_conflict;

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use branch::{Branch, BranchSearch};
pub use cashier::{Cashier, CashierSearch};
pub use customer::{Customer, CustomerSearch};
pub use owner::{Owner, OwnerRole};
pub use product::{Product, ProductSearch};
pub use sale::{Sale, SaleItem, SaleSearch};
pub use supplier::{Supplier, SupplierSearch};
pub use sync_conflict::SyncConflict;

/// Generate a new record identifier (UUID v7, time-sortable)
#[must_use]
pub fn new_record_id() -> String {
    Uuid::now_v7().to_string()
}

/// The synchronized entity types, in the order the merge engine processes them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Product,
    Branch,
    Cashier,
    Supplier,
    Sale,
    Customer,
}

impl EntityKind {
    /// All synchronized entity types in processing order
    pub const ALL: [Self; 6] = [
        Self::Product,
        Self::Branch,
        Self::Cashier,
        Self::Supplier,
        Self::Sale,
        Self::Customer,
    ];

    /// Singular lowercase name (`product`)
    pub const fn name(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Branch => "branch",
            Self::Cashier => "cashier",
            Self::Supplier => "supplier",
            Self::Sale => "sale",
            Self::Customer => "customer",
        }
    }

    /// Wire/collection name (`products`)
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Product => "products",
            Self::Branch => "branches",
            Self::Cashier => "cashiers",
            Self::Supplier => "suppliers",
            Self::Sale => "sales",
            Self::Customer => "customers",
        }
    }

    /// Local namespace holding the live collection
    pub fn records_namespace(self) -> String {
        format!("{}_records", self.name())
    }

    /// Local namespace holding the tombstoned ids
    pub fn tombstones_namespace(self) -> String {
        format!("{}_deleted_ids", self.name())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted || kind.collection() == wanted)
            .ok_or_else(|| crate::Error::InvalidInput(format!("Unknown entity type: {s}")))
    }
}

/// A record that takes part in the sync protocol
pub trait Entity:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Which collection this record belongs to
    const KIND: EntityKind;

    /// Filter accepted by the remote search endpoint for this entity type
    type Search: Default + fmt::Debug + Serialize + DeserializeOwned + Send + Sync;

    /// Reconciliation key
    fn id(&self) -> &str;

    /// Wall-clock modification time (Unix ms)
    fn last_modified(&self) -> i64;

    /// Logical modification counter
    fn version(&self) -> u64;

    /// Overwrite the modification stamp
    fn set_stamp(&mut self, last_modified: i64, version: u64);

    /// Whether this record satisfies a search filter
    fn matches(&self, filter: &Self::Search) -> bool;

    /// Order search results. Default keeps storage order.
    fn sort_search_results(_records: &mut [Self]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_unique() {
        assert_ne!(new_record_id(), new_record_id());
    }

    #[test]
    fn test_namespaces() {
        assert_eq!(EntityKind::Product.records_namespace(), "product_records");
        assert_eq!(
            EntityKind::Branch.tombstones_namespace(),
            "branch_deleted_ids"
        );
    }

    #[test]
    fn test_entity_kind_parse_accepts_singular_and_plural() {
        assert_eq!(
            "products".parse::<EntityKind>().unwrap(),
            EntityKind::Product
        );
        assert_eq!(" Sale ".parse::<EntityKind>().unwrap(), EntityKind::Sale);
        assert_eq!(
            "branches".parse::<EntityKind>().unwrap(),
            EntityKind::Branch
        );
        assert!("invoices".parse::<EntityKind>().is_err());
    }
}
