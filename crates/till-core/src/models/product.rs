//! Product model

use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind};
use crate::util::{contains_ignore_case, equals_filter};

/// A sellable product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub stock: i64,
    /// Supplier name or id, free text
    #[serde(default)]
    pub supplier: String,
    #[serde(default)]
    pub last_modified: i64,
    #[serde(default)]
    pub version: u64,
}

impl Product {
    /// Create a new product with a fresh id
    #[must_use]
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            id: super::new_record_id(),
            name: name.into(),
            category: String::new(),
            description: String::new(),
            price,
            stock: 0,
            supplier: String::new(),
            last_modified: 0,
            version: 0,
        }
    }
}

/// Remote product search filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSearch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
}

impl Entity for Product {
    const KIND: EntityKind = EntityKind::Product;
    type Search = ProductSearch;

    fn id(&self) -> &str {
        &self.id
    }

    fn last_modified(&self) -> i64 {
        self.last_modified
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_stamp(&mut self, last_modified: i64, version: u64) {
        self.last_modified = last_modified;
        self.version = version;
    }

    fn matches(&self, filter: &ProductSearch) -> bool {
        contains_ignore_case(&self.name, filter.name.as_deref())
            && equals_filter(&self.category, filter.category.as_deref())
            && equals_filter(&self.supplier, filter.supplier.as_deref())
    }
}
