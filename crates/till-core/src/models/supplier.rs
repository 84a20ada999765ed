//! Supplier model

use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind};
use crate::util::{contains_ignore_case, equals_filter};

/// A product supplier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub last_modified: i64,
    #[serde(default)]
    pub version: u64,
}

impl Supplier {
    /// Create a new supplier with a fresh id
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: super::new_record_id(),
            name: name.into(),
            location: String::new(),
            phone: String::new(),
            email: String::new(),
            category: String::new(),
            last_modified: 0,
            version: 0,
        }
    }
}

/// Remote supplier search filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierSearch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Entity for Supplier {
    const KIND: EntityKind = EntityKind::Supplier;
    type Search = SupplierSearch;

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

    fn matches(&self, filter: &SupplierSearch) -> bool {
        contains_ignore_case(&self.name, filter.name.as_deref())
            && equals_filter(&self.category, filter.category.as_deref())
    }
}
