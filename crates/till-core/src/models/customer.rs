//! Customer model

use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind};
use crate::util::contains_ignore_case;

/// A customer, referenced from invoices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub last_modified: i64,
    #[serde(default)]
    pub version: u64,
}

impl Customer {
    /// Create a new customer with a fresh id
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: super::new_record_id(),
            name: name.into(),
            phone: String::new(),
            email: String::new(),
            address: String::new(),
            last_modified: 0,
            version: 0,
        }
    }
}

/// Remote customer search filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSearch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Entity for Customer {
    const KIND: EntityKind = EntityKind::Customer;
    type Search = CustomerSearch;

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

    fn matches(&self, filter: &CustomerSearch) -> bool {
        contains_ignore_case(&self.name, filter.name.as_deref())
    }
}
